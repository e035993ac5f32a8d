//! # collision — demo game
//!
//! A minimal game built on `reflex_ecs`: a player drifts toward a
//! stationary enemy, a collision system emits events when colliders
//! overlap, and an event-driven reaction system despawns both parties and
//! scores the hit. Rendering is a `LateUpdate` system that logs what it
//! would draw.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reflex_ecs::{Ctx, EcsError, Entity, Phase, Plugin, Query, World};

#[derive(Debug)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Debug)]
struct Renderable {
    sprite: &'static str,
}

#[derive(Debug)]
struct Collider {
    radius: f32,
}

#[derive(Debug)]
struct Score {
    value: u32,
}

#[derive(Debug)]
struct GameConfig {
    width: u32,
    height: u32,
}

/// Emitted once per overlapping collider pair, per tick.
struct Collision {
    a: Entity,
    b: Entity,
}

fn spawn_actors(ctx: Ctx<'_>) {
    let commands = ctx.commands(0);
    commands.spawn((
        Position { x: 0.0, y: 0.0 },
        Velocity { dx: 1.0, dy: 1.0 },
        Renderable {
            sprite: "player.png",
        },
        Collider { radius: 10.0 },
    ));
    commands.spawn((
        Position { x: 100.0, y: 100.0 },
        Renderable {
            sprite: "enemy.png",
        },
        Collider { radius: 10.0 },
    ));
    commands.insert_resource(GameConfig {
        width: 800,
        height: 600,
    });
    commands.insert_resource(Score { value: 0 });
}

/// Integrates velocity into position. The filter keeps entities moving
/// only while they are left of x = 100.
fn movement(ctx: Ctx<'_>) {
    for entity in ctx.entities(0) {
        let position = entity.get::<Position>().unwrap();
        let velocity = entity.get::<Velocity>().unwrap();
        let velocity = velocity.borrow();
        let mut position = position.borrow_mut();
        position.x += velocity.dx;
        position.y += velocity.dy;
    }
}

fn detect_collisions(ctx: Ctx<'_>) {
    let entities = ctx.entities(0);
    let writer = ctx.writer::<Collision>(1);
    for i in 0..entities.len() {
        for j in i + 1..entities.len() {
            let pos_a = entities[i].get::<Position>().unwrap();
            let pos_b = entities[j].get::<Position>().unwrap();
            let col_a = entities[i].get::<Collider>().unwrap();
            let col_b = entities[j].get::<Collider>().unwrap();
            let (pos_a, pos_b) = (pos_a.borrow(), pos_b.borrow());
            let dx = pos_a.x - pos_b.x;
            let dy = pos_a.y - pos_b.y;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance < col_a.borrow().radius + col_b.borrow().radius {
                writer.write(Collision {
                    a: entities[i].clone(),
                    b: entities[j].clone(),
                });
            }
        }
    }
}

/// Reacts to collisions published the previous tick: despawns both
/// parties and scores the hit.
fn on_collision(ctx: Ctx<'_>) {
    let reader = ctx.reader::<Collision>(0);
    let commands = ctx.commands(1);
    let score = ctx.resource::<Score>(2);
    for collision in reader.read() {
        info!(
            a = collision.a.id(),
            b = collision.b.id(),
            "collision resolved"
        );
        commands.despawn(&collision.a);
        commands.despawn(&collision.b);
        score.borrow_mut().value += 1;
    }
}

fn render(ctx: Ctx<'_>) {
    let config = ctx.resource::<GameConfig>(1);
    let config = config.borrow();
    for entity in ctx.entities(0) {
        let position = entity.get::<Position>().unwrap();
        let renderable = entity.get::<Renderable>().unwrap();
        let position = position.borrow();
        info!(
            sprite = renderable.borrow().sprite,
            x = position.x,
            y = position.y,
            width = config.width,
            height = config.height,
            "render"
        );
    }
}

struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, world: &mut World) -> Result<(), EcsError> {
        world.register_event::<Collision>();
        world.add_system(
            Phase::StartUp,
            "spawn_actors",
            vec![Query::commands()],
            spawn_actors,
        )?;
        world.add_system(
            Phase::Update,
            "movement",
            vec![Query::entities::<(Position, Velocity)>()
                .filtered(|e| e.get::<Position>().map_or(true, |p| p.borrow().x < 100.0))],
            movement,
        )?;
        world.add_system(
            Phase::Update,
            "detect_collisions",
            vec![
                Query::entities::<(Position, Collider)>(),
                Query::writer::<Collision>(),
            ],
            detect_collisions,
        )?;
        world.add_system(
            Phase::Update,
            "on_collision",
            vec![
                Query::reader::<Collision>(),
                Query::commands(),
                Query::resource::<Score>(),
            ],
            on_collision,
        )?;
        world.add_system(
            Phase::LateUpdate,
            "render",
            vec![
                Query::entities::<(Position, Renderable)>(),
                Query::resource::<GameConfig>(),
            ],
            render,
        )?;
        Ok(())
    }
}

/// Ticks to run before giving up on the simulation settling.
const MAX_TICKS: u64 = 200;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("collision=info".parse()?))
        .init();

    info!("collision demo starting");

    let mut world = World::new();
    world.add_plugin(GamePlugin)?;
    world.start_up();

    for _ in 0..MAX_TICKS {
        world.run_tick();
        if world.frame() > 1 && world.entity_count() == 0 {
            break;
        }
    }

    let score = world
        .get_resource::<Score>()
        .map_or(0, |score| score.borrow().value);
    info!(
        frames = world.frame(),
        score, "collision demo finished"
    );
    Ok(())
}
