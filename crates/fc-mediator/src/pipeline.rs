//! Composes a handler and its ordered behaviors into one callable chain at
//! registration time, so dispatch never re-walks a behavior list per call.

use std::sync::Arc;

use fc_common::{MediatorResult, Request};
use tokio_util::sync::CancellationToken;

use crate::behavior::{Behavior, BoxFuture, Next};
use crate::handler::Handler;

pub type Chain<T> =
    Arc<dyn Fn(T, CancellationToken) -> BoxFuture<'static, MediatorResult<<T as Request>::Response>> + Send + Sync>;

/// `behaviors` in any order; sorted by priority (highest outermost) before
/// nesting, so `b_1(b_2(...b_n(handler)...))` always holds regardless of the
/// order they were registered in. The `CancellationToken` passed into the
/// resulting chain flows unchanged through every behavior down to the
/// handler.
pub fn compose<T, H>(handler: Arc<H>, mut behaviors: Vec<Arc<dyn Behavior<T>>>) -> Chain<T>
where
    T: Request,
    H: Handler<T> + 'static,
{
    behaviors.sort_by(|a, b| b.priority().cmp(&a.priority()));

    let mut chain: Chain<T> = {
        let handler = handler.clone();
        Arc::new(move |req: T, token: CancellationToken| -> BoxFuture<'static, MediatorResult<T::Response>> {
            let handler = handler.clone();
            Box::pin(async move { handler.handle(req, token).await })
        })
    };

    // Wrap from the innermost (lowest priority) behavior outward so the
    // highest-priority behavior ends up as the entry point of the chain.
    for behavior in behaviors.into_iter().rev() {
        let inner = chain.clone();
        chain = Arc::new(move |req: T, token: CancellationToken| -> BoxFuture<'static, MediatorResult<T::Response>> {
            let behavior = behavior.clone();
            let inner = inner.clone();
            Box::pin(async move {
                let next = Next::new(move |req, token| inner(req, token));
                behavior.invoke(req, token, next).await
            })
        });
    }

    chain
}
