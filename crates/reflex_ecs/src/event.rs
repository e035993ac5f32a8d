//! Double-buffered event channels.
//!
//! Each registered event kind owns one channel with a write buffer and a
//! read buffer. Writes land in the write buffer and mark the channel dirty
//! at the world level; at the start of the next tick the world flushes the
//! channel (swap buffers, clear the new write buffer) and, one tick later,
//! clears the read buffer. The net effect: an event written during tick N
//! is invisible during tick N, read-visible during exactly tick N+1, and
//! gone by tick N+2 absent a new write.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

struct ChannelInner {
    kind: TypeId,
    name: &'static str,
    write: RefCell<Vec<Rc<dyn Any>>>,
    read: RefCell<Vec<Rc<dyn Any>>>,
}

/// A shared handle to one event channel.
#[derive(Clone)]
pub(crate) struct EventChannel {
    inner: Rc<ChannelInner>,
}

impl EventChannel {
    pub(crate) fn new<E: 'static>() -> Self {
        Self {
            inner: Rc::new(ChannelInner {
                kind: TypeId::of::<E>(),
                name: std::any::type_name::<E>(),
                write: RefCell::new(Vec::new()),
                read: RefCell::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn kind(&self) -> TypeId {
        self.inner.kind
    }

    pub(crate) fn name(&self) -> &'static str {
        self.inner.name
    }

    pub(crate) fn push(&self, event: Rc<dyn Any>) {
        self.inner.write.borrow_mut().push(event);
    }

    /// Swap the buffers and clear the new write buffer. Returns whether the
    /// read buffer is non-empty afterwards, i.e. whether bound readers need
    /// a refresh.
    pub(crate) fn flush(&self) -> bool {
        let mut write = self.inner.write.borrow_mut();
        let mut read = self.inner.read.borrow_mut();
        std::mem::swap(&mut *write, &mut *read);
        write.clear();
        !read.is_empty()
    }

    /// Empty the read buffer. Returns whether it had content, i.e. whether
    /// bound readers need a refresh.
    pub(crate) fn clear_read(&self) -> bool {
        let mut read = self.inner.read.borrow_mut();
        let had_content = !read.is_empty();
        read.clear();
        had_content
    }

    pub(crate) fn read_is_empty(&self) -> bool {
        self.inner.read.borrow().is_empty()
    }

    pub(crate) fn read_len(&self) -> usize {
        self.inner.read.borrow().len()
    }

    fn read_all<E: 'static>(&self) -> Vec<Rc<E>> {
        self.inner
            .read
            .borrow()
            .iter()
            .filter_map(|event| event.clone().downcast::<E>().ok())
            .collect()
    }
}

/// The set of channels dirtied since the last flush, tracked at the world
/// level and shared into every event-writer handle.
#[derive(Clone, Default)]
pub(crate) struct DirtyMarks {
    marks: Rc<RefCell<Vec<TypeId>>>,
}

impl DirtyMarks {
    pub(crate) fn mark(&self, kind: TypeId) {
        let mut marks = self.marks.borrow_mut();
        if !marks.contains(&kind) {
            marks.push(kind);
        }
    }

    pub(crate) fn take(&self) -> Vec<TypeId> {
        std::mem::take(&mut *self.marks.borrow_mut())
    }
}

/// The write side of an event channel, handed to systems that declared
/// [`crate::Query::writer`].
pub struct EventWriter<E> {
    channel: EventChannel,
    marks: DirtyMarks,
    _marker: PhantomData<E>,
}

impl<E: 'static> EventWriter<E> {
    pub(crate) fn new(channel: EventChannel, marks: DirtyMarks) -> Self {
        Self {
            channel,
            marks,
            _marker: PhantomData,
        }
    }

    /// Append an event to the write buffer. It becomes read-visible at the
    /// next tick boundary.
    pub fn write(&self, event: E) {
        self.channel.push(Rc::new(event));
        self.marks.mark(self.channel.kind());
    }
}

/// The read side of an event channel, handed to systems that declared
/// [`crate::Query::reader`].
///
/// A system with a reader parameter is only invoked while the read buffer
/// is non-empty, so `read()` never yields an empty list inside a system.
pub struct EventReader<E> {
    channel: EventChannel,
    _marker: PhantomData<E>,
}

impl<E: 'static> EventReader<E> {
    pub(crate) fn new(channel: EventChannel) -> Self {
        Self {
            channel,
            _marker: PhantomData,
        }
    }

    /// All events currently read-visible, in write order.
    #[must_use]
    pub fn read(&self) -> Vec<Rc<E>> {
        self.channel.read_all::<E>()
    }

    /// The first read-visible event, if any.
    #[must_use]
    pub fn peek(&self) -> Option<Rc<E>> {
        self.channel
            .inner
            .read
            .borrow()
            .first()
            .and_then(|event| event.clone().downcast::<E>().ok())
    }

    /// Number of read-visible events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channel.read_len()
    }

    /// Whether the read buffer is drained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channel.read_is_empty()
    }
}
