//! Blocking forms of the [`ProtoClient`](crate::ProtoClient) operations.
//!
//! Each call spawns its pending result on a shared multi-thread runtime and parks the
//! calling thread until it finishes, so the forms also work from `spawn_blocking`
//! threads. Avoid them on async worker threads; await the `*_async` forms there.

mod proto_client;

use once_cell::sync::Lazy;
use tokio::runtime::Runtime;
use tokio::task::JoinError;

use crate::api::PendingResult;
use crate::error::{cancelled, internal_error, ProtoStoreError, ProtoStoreResult};

static RT: Lazy<Result<Runtime, String>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("proto-store-blocking")
        .build()
        .map_err(|err| err.to_string())
});

fn block_on<T>(pending: ProtoStoreResult<PendingResult<T>>) -> ProtoStoreResult<T>
where
    T: Send + 'static,
{
    let pending = pending?;
    let runtime = RT
        .as_ref()
        .map_err(|err| internal_error(format!("Failed to start blocking runtime: {err}")))?;
    let handle = runtime.spawn(pending);
    futures::executor::block_on(handle).map_err(map_join_error)?
}

fn map_join_error(err: JoinError) -> ProtoStoreError {
    if err.is_cancelled() {
        cancelled("Blocking call was interrupted before completing")
    } else {
        internal_error(format!("Blocking call failed: {err}"))
    }
}
