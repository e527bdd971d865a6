//! Single-value Actor for reactive state owned by one processing loop
//!
//! An Actor owns a `Mutable<T>` and the task that mutates it. Dropping the
//! last clone of the Actor drops the task handle, which cancels the loop.

use std::future::Future;
use std::rc::Rc;
use zoon::{Mutable, Signal, Task, TaskHandle};

/// Reactive state container driven by an async processing loop.
///
/// # Examples
///
/// ```rust
/// let (pointer_event_relay, mut pointer_stream) = relay();
///
/// let hovered = Actor::new(None, async move |state| {
///     while let Some(event) = pointer_stream.next().await {
///         state.set_neq(Some(event));
///     }
/// });
///
/// El::new().child_signal(hovered.signal_ref(|cell| format!("{cell:?}")))
/// ```
#[derive(Clone)]
pub struct Actor<T>
where
    T: Clone + 'static,
{
    state: Mutable<T>,
    #[allow(dead_code)]
    task_handle: Rc<TaskHandle>,
}

impl<T> Actor<T>
where
    T: Clone + 'static,
{
    /// Starts `processor` with a handle to the freshly created state.
    pub fn new<F, Fut>(initial_state: T, processor: F) -> Self
    where
        F: FnOnce(Mutable<T>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let state = Mutable::new(initial_state);
        let task_handle = Rc::new(Task::start_droppable(processor(state.clone())));
        Self { state, task_handle }
    }

    pub fn signal_ref<U, F>(&self, f: F) -> impl Signal<Item = U> + use<T, U, F>
    where
        U: 'static,
        F: FnMut(&T) -> U + 'static,
    {
        self.state.signal_ref(f)
    }
}

impl<T> std::fmt::Debug for Actor<T>
where
    T: Clone + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("state", &*self.state.lock_ref())
            .finish()
    }
}
