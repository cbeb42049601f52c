//! Query and mutation factory over a shared response cache.
//!
//! Every resource module builds its reads with [`create_query`] and its
//! writes with [`create_mutation`]:
//! - queries cache by typed [`QueryKey`] and refetch when missing or stale
//! - mutations invalidate by [`Resource`] tag and raise notifications
//! - a query can be held back by a guard until its parameters are known

mod cache;
mod factory;
mod key;
mod mutation;
mod notify;
mod state;

pub use cache::{Cached, QueryClient};
pub use factory::{create_query, Query, QueryOptions};
pub use key::{KeyPart, QueryKey, Resource};
pub use mutation::{create_mutation, Message, Mutation, MutationBuilder, PendingMutation};
pub use notify::{ChannelNotifier, Level, Notification, Notifier, TracingNotifier};
pub use state::{MutationState, QueryState};
