//! Handler system.
//!
//! - **Service** ([`service`]): the [`Handler`] trait and the
//!   [`HandlerService`] that adapts a handler into a `tower::Service`.
//! - **Filter** ([`filter`]): tower [`Predicate`](tower::filter::Predicate)s
//!   that narrow a request step by step.
//!
//! ```text
//! addressed_match(p)          ← ServiceBuilder with filter layers pre-stacked
//!     .handler(my_handler)    ← Filter<Filter<Filter<HandlerService>>>
//! ```

pub mod filter;
pub mod service;

use tower::filter::FilterLayer;
use tower::{Layer, ServiceBuilder};
use tower_layer::Stack;

pub use filter::{AddressedFilter, CommandFilter, PatternFilter, SubtypeFilter};
pub use service::{Handler, HandlerService, IntoHandlerResult};

/// Extension trait for [`tower::ServiceBuilder`].
pub trait ServiceBuilderExt<L> {
    /// Wraps `handler` in a [`HandlerService`] and applies the stacked layers.
    fn handler<H>(self, handler: H) -> L::Service
    where
        L: Layer<HandlerService<H>>;

    /// Adds the addressing filter.
    fn addressed(self) -> ServiceBuilder<Stack<FilterLayer<AddressedFilter>, L>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn handler<H>(self, handler: H) -> L::Service
    where
        L: Layer<HandlerService<H>>,
    {
        self.service(HandlerService::new(handler))
    }

    fn addressed(self) -> ServiceBuilder<Stack<FilterLayer<AddressedFilter>, L>> {
        self.filter(AddressedFilter)
    }
}
