use std::sync::Arc;

use crate::collaborators::Parent;
use crate::state::State;

/// Bridges the parent's RPC-level disconnect notifications with cluster-level pod
/// bookkeeping (spec §4.5). The disable gate on `Parent::disable_executor` prevents
/// double-scheduling removal; once marked, resolution is owned entirely by the next
/// Allocator tick.
pub struct DriverEndpoint<P> {
    state: Arc<State>,
    parent: Arc<P>,
}

impl<P: Parent> DriverEndpoint<P> {
    pub fn new(state: Arc<State>, parent: Arc<P>) -> Self {
        DriverEndpoint { state, parent }
    }

    pub async fn on_disconnected(&self, remote_address: &str) {
        let Some(id) = self.parent.address_to_executor(remote_address).await else {
            log::warn!("disconnect from unknown address {}", remote_address);
            return;
        };
        if self.parent.disable_executor(&id).await {
            self.state.mark_pending_removal(&id).await;
        }
    }
}
