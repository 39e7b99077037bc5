use std::fmt;

use async_trait::async_trait;
use verirag_core::VeriragError;

use crate::{GraphState, StateSchema};

/// The closed set of outcomes a conditional node can produce.
///
/// `ALL` must list every variant; the graph builder walks it to check that each
/// label is mapped to a registered node before the graph is ever run.
pub trait RouteLabel: Copy + fmt::Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;
}

/// A decision node: reads state, never writes it.
#[async_trait]
pub trait Router<S: StateSchema>: Send + Sync {
    type Route: RouteLabel;

    async fn route(&self, state: &GraphState<S>) -> Result<Self::Route, VeriragError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub label: &'static str,
    pub next: &'static str,
}

#[async_trait]
pub(crate) trait ErasedRouter<S: StateSchema>: Send + Sync {
    async fn decide(&self, state: &GraphState<S>) -> Result<Decision, VeriragError>;

    fn table(&self) -> Vec<Decision>;
}

pub(crate) struct RoutedNode<R, F> {
    router: R,
    table: F,
}

impl<R, F> RoutedNode<R, F> {
    pub(crate) fn new(router: R, table: F) -> Self {
        Self { router, table }
    }
}

#[async_trait]
impl<S, R, F> ErasedRouter<S> for RoutedNode<R, F>
where
    S: StateSchema,
    R: Router<S>,
    F: Fn(R::Route) -> &'static str + Send + Sync,
{
    async fn decide(&self, state: &GraphState<S>) -> Result<Decision, VeriragError> {
        let route = self.router.route(state).await?;
        Ok(Decision {
            label: route.label(),
            next: (self.table)(route),
        })
    }

    fn table(&self) -> Vec<Decision> {
        R::Route::ALL
            .iter()
            .map(|route| Decision {
                label: route.label(),
                next: (self.table)(*route),
            })
            .collect()
    }
}
