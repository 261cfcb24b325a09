//! Ordered middleware registry.
//!
//! # Responsibilities
//! - Collect descriptors contributed by the server and its collaborators
//! - Weave them, sorted by priority, into an [`Application`]
//!
//! Descriptors are consumed by a successful [`MiddlewareRegistry::weave`];
//! a failed weave leaves them in place for the next attempt. Weaving is
//! meant to happen once, before the listener accepts connections; weaving
//! again after `start` only mounts descriptors injected since and the result
//! is not attached to the running server.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::WeaveError;
use crate::pipeline::handler::Middleware;

/// One middleware contribution.
#[derive(Clone)]
pub struct MiddlewareDescriptor {
    /// Name used in logs. Unique by convention only.
    pub name: String,
    /// `None` mounts globally; `Some(vec![])` disables the descriptor.
    pub path: Option<Vec<String>>,
    pub handler: Middleware,
    pub priority: i64,
}

impl MiddlewareDescriptor {
    pub fn new(name: impl Into<String>, handler: Middleware, priority: i64) -> Self {
        Self {
            name: name.into(),
            path: None,
            handler,
            priority,
        }
    }

    pub fn with_path<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = Some(paths.into_iter().map(Into::into).collect());
        self
    }
}

impl fmt::Debug for MiddlewareDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareDescriptor")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// What a collaborator hands to [`MiddlewareRegistry::inject`].
pub enum Injection {
    /// A bare handler; missing fields get defaults (priority 0).
    Handler {
        handler: Middleware,
        path: Option<Vec<String>>,
        priority: Option<i64>,
        name: Option<String>,
    },
    /// A complete descriptor, appended verbatim.
    Descriptor(MiddlewareDescriptor),
}

impl From<MiddlewareDescriptor> for Injection {
    fn from(descriptor: MiddlewareDescriptor) -> Self {
        Injection::Descriptor(descriptor)
    }
}

impl From<Middleware> for Injection {
    fn from(handler: Middleware) -> Self {
        Injection::Handler {
            handler,
            path: None,
            priority: None,
            name: None,
        }
    }
}

/// The `use(path?, handler)` contract of an HTTP application.
pub trait Application {
    /// Mount `handler`, restricted to `scope` when given.
    fn mount(
        &mut self,
        name: &str,
        scope: Option<&[String]>,
        handler: Middleware,
    ) -> Result<(), WeaveError>;
}

/// Registry of middleware descriptors awaiting weaving.
#[derive(Default)]
pub struct MiddlewareRegistry {
    descriptors: Mutex<Vec<MiddlewareDescriptor>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MiddlewareDescriptor>> {
        self.descriptors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Contribute a handler or descriptor.
    pub fn inject(&self, injection: impl Into<Injection>) {
        let mut descriptors = self.lock();
        let descriptor = match injection.into() {
            Injection::Descriptor(descriptor) => descriptor,
            Injection::Handler {
                handler,
                path,
                priority,
                name,
            } => MiddlewareDescriptor {
                name: name.unwrap_or_else(|| format!("middleware-{}", descriptors.len())),
                path,
                handler,
                priority: priority.unwrap_or(0),
            },
        };
        tracing::debug!(
            name = %descriptor.name,
            priority = descriptor.priority,
            path = ?descriptor.path,
            "Middleware injected"
        );
        descriptors.push(descriptor);
    }

    /// Convenience form of [`inject`](Self::inject) for a bare handler.
    pub fn inject_handler(
        &self,
        handler: Middleware,
        path: Option<Vec<String>>,
        priority: Option<i64>,
        name: Option<String>,
    ) {
        self.inject(Injection::Handler {
            handler,
            path,
            priority,
            name,
        });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Names and priorities in weave order, without consuming anything.
    pub fn plan(&self) -> Vec<(String, i64)> {
        let mut plan: Vec<_> = self
            .lock()
            .iter()
            .map(|d| (d.name.clone(), d.priority))
            .collect();
        plan.sort_by_key(|(_, priority)| *priority);
        plan
    }

    /// Sort descriptors by ascending priority (ties keep insertion order)
    /// and mount them on `app`. Returns the number of mounted descriptors.
    ///
    /// A mount failure aborts weaving and keeps every descriptor; only a
    /// complete weave consumes them.
    pub fn weave<A: Application + ?Sized>(&self, app: &mut A) -> Result<usize, WeaveError> {
        let mut descriptors = self.lock().clone();
        let snapshot = descriptors.len();
        descriptors.sort_by_key(|d| d.priority);

        let mut mounted = 0;
        for descriptor in descriptors {
            match descriptor.path.as_deref() {
                Some([]) => {
                    tracing::debug!(name = %descriptor.name, "Middleware skipped: empty path filter");
                }
                scope => {
                    tracing::debug!(
                        name = %descriptor.name,
                        path = ?scope.unwrap_or(&[]),
                        priority = descriptor.priority,
                        "Middleware loaded"
                    );
                    app.mount(&descriptor.name, scope, descriptor.handler.clone())?;
                    mounted += 1;
                }
            }
        }
        // Injections made while weaving were appended after the snapshot.
        self.lock().drain(..snapshot);
        Ok(mounted)
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("descriptors", &*self.lock())
            .finish()
    }
}
