use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cloneable view of a [`VeracityRuntime`]: spawn work and observe shutdown.
#[derive(Clone)]
pub struct VeracityHandle {
    inner: Handle,
    cancel: CancellationToken,
}

/// Tokio runtime plus the root cancellation token every analysis hangs off.
pub struct VeracityRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl VeracityRuntime {
    /// Build a multi-threaded runtime with all drivers enabled.
    ///
    /// ```
    /// use veracity_runtime::VeracityRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = VeracityRuntime::build("doctest-runtime", Some(1))
    ///     .expect("runtime builds");
    /// assert_eq!(runtime.block_on(async { 2 + 2 }), 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);

        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }

        let runtime = builder
            .build()
            .with_context(|| format!("failed to build runtime {thread_name:?}"))?;
        Ok(Self {
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    pub fn handle(&self) -> VeracityHandle {
        VeracityHandle {
            inner: self.runtime.handle().clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Run a future to completion on the runtime.
    ///
    /// ```
    /// use veracity_runtime::VeracityRuntime;
    ///
    /// let runtime = VeracityRuntime::build("block-on-example", Some(1)).unwrap();
    /// assert_eq!(runtime.block_on(async { "done" }), "done");
    /// ```
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel the root token when the process receives Ctrl-C.
    ///
    /// Work that selects on [`VeracityHandle::cancellation`] (or a child of
    /// it) winds down instead of being killed mid-request.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        tracing::info!("runtime.interrupt");
                        cancel.cancel();
                    }
                    Err(e) => tracing::warn!(error = %e, "runtime.signal_unavailable"),
                },
            }
        })
    }

    /// Cancel outstanding work and shut the runtime down.
    ///
    /// ```
    /// use veracity_runtime::VeracityRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = VeracityRuntime::build("shutdown-example", Some(1)).unwrap();
    /// let cancel = runtime.handle().cancellation();
    /// runtime.shutdown(Duration::from_millis(5));
    /// assert!(cancel.is_cancelled());
    /// ```
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

impl VeracityHandle {
    /// Spawn a future onto the shared runtime.
    ///
    /// ```
    /// use veracity_runtime::VeracityRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = VeracityRuntime::build("handle-doctest", Some(1)).unwrap();
    /// let task = runtime.handle().spawn(async { 21 * 2 });
    /// assert_eq!(runtime.block_on(async move { task.await.unwrap() }), 42);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    /// The root token; cancelling it stops everything on this runtime.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// A token for a single unit of work. Cancelled with the root, but
    /// cancelling it leaves the root and its siblings running.
    ///
    /// ```
    /// use veracity_runtime::VeracityRuntime;
    ///
    /// let runtime = VeracityRuntime::build("child-example", Some(1)).unwrap();
    /// let handle = runtime.handle();
    /// let one = handle.child_token();
    /// let two = handle.child_token();
    /// one.cancel();
    /// assert!(!two.is_cancelled());
    /// assert!(!handle.cancellation().is_cancelled());
    /// ```
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }
}
