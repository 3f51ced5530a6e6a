//! Deterministic in-memory kernel for lifecycle tests
//!
//! Holds links and routes, records every call made through [`NetlinkOps`],
//! and can be told to fail specific operations or to simulate a concurrent
//! VRF creation.

use std::collections::{HashMap, HashSet};

use fabric_common::{FabricError, FabricResult, IpFamily, Link, LinkKind, NetlinkOps, Route};
use parking_lot::Mutex;

/// First interface index handed out; lower ones belong to host links.
const FIRST_INDEX: u32 = 10;

/// A call received through [`NetlinkOps`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelCall {
    ListLinks,
    CreateVrf { name: String, table_id: u32 },
    DeleteLink { name: String },
    ListRoutes { family: IpFamily, table_id: u32 },
    DeleteRoute(Route),
    SetLinkUp { name: String },
}

/// Operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOp {
    ListLinks,
    CreateVrf,
    DeleteLink,
    ListRoutes,
    DeleteRoute,
    SetLinkUp,
}

#[derive(Debug, Default)]
struct KernelState {
    links: Vec<Link>,
    routes: Vec<Route>,
    next_index: u32,
    calls: Vec<KernelCall>,
    failures: HashSet<FailOp>,
    race: Option<String>,
    routes_at_create: HashMap<String, usize>,
}

impl KernelState {
    fn allocate_index(&mut self) -> u32 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn push_vrf(&mut self, name: &str, table_id: u32) -> u32 {
        let index = self.allocate_index();
        self.links.push(Link {
            index,
            name: name.to_string(),
            kind: Some(LinkKind::Vrf),
            vrf_table: Some(table_id),
            up: false,
        });
        index
    }

    fn check(&self, op: FailOp, call: &str) -> FabricResult<()> {
        if !self.failures.contains(&op) {
            return Ok(());
        }
        let message = "injected failure";
        match op {
            FailOp::ListLinks | FailOp::ListRoutes => {
                Err(FabricError::platform_query(call, message))
            }
            _ => Err(FabricError::platform_mutation(call, message)),
        }
    }
}

/// In-memory stand-in for the kernel link/route tables
#[derive(Debug)]
pub struct FakeKernel {
    state: Mutex<KernelState>,
}

impl FakeKernel {
    /// Create an empty kernel
    pub fn new() -> Self {
        Self {
            state: Mutex::new(KernelState {
                next_index: FIRST_INDEX,
                ..KernelState::default()
            }),
        }
    }

    /// Add a VRF link (administratively down)
    pub fn with_vrf(self, name: &str, table_id: u32) -> Self {
        self.add_vrf(name, table_id);
        self
    }

    /// Add a non-VRF link
    pub fn with_link(self, name: &str, kind: &str) -> Self {
        {
            let mut state = self.state.lock();
            let index = state.allocate_index();
            state.links.push(Link {
                index,
                name: name.to_string(),
                kind: Some(LinkKind::from_kernel(kind)),
                vrf_table: None,
                up: true,
            });
        }
        self
    }

    /// Add a route
    pub fn with_route(self, route: Route) -> Self {
        self.add_route(route);
        self
    }

    /// Add a VRF link, returning its interface index
    pub fn add_vrf(&self, name: &str, table_id: u32) -> u32 {
        self.state.lock().push_vrf(name, table_id)
    }

    /// Add a route
    pub fn add_route(&self, route: Route) {
        self.state.lock().routes.push(route);
    }

    /// Remove a link without touching its routes, as an external actor would
    pub fn remove_link(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.links.len();
        state.links.retain(|link| link.name != name);
        state.links.len() != before
    }

    /// Make every later call of `op` fail
    pub fn fail_on(&self, op: FailOp) {
        self.state.lock().failures.insert(op);
    }

    /// Stop injecting failures
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// On the next VRF creation, first create `foreign` bound to the same
    /// table, as a concurrent process would
    pub fn race_on_create(&self, foreign: &str) {
        self.state.lock().race = Some(foreign.to_string());
    }

    /// All links
    pub fn links(&self) -> Vec<Link> {
        self.state.lock().links.clone()
    }

    /// Link by name
    pub fn link(&self, name: &str) -> Option<Link> {
        self.state
            .lock()
            .links
            .iter()
            .find(|link| link.name == name)
            .cloned()
    }

    /// All routes
    pub fn routes(&self) -> Vec<Route> {
        self.state.lock().routes.clone()
    }

    /// Routes of both families in one table
    pub fn routes_in_table(&self, table_id: u32) -> Vec<Route> {
        self.state
            .lock()
            .routes
            .iter()
            .filter(|route| route.table == table_id)
            .cloned()
            .collect()
    }

    /// Number of routes the table held when the VRF `name` was created
    pub fn routes_at_create(&self, name: &str) -> Option<usize> {
        self.state.lock().routes_at_create.get(name).copied()
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<KernelCall> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl Default for FakeKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl NetlinkOps for FakeKernel {
    fn list_links(&self, kind: Option<LinkKind>) -> FabricResult<Vec<Link>> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::ListLinks);
        state.check(FailOp::ListLinks, "list_links")?;

        Ok(state
            .links
            .iter()
            .filter(|link| kind.is_none() || link.kind == kind)
            .cloned()
            .collect())
    }

    fn create_vrf(&self, name: &str, table_id: u32) -> FabricResult<()> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::CreateVrf {
            name: name.to_string(),
            table_id,
        });
        state.check(FailOp::CreateVrf, "create_vrf")?;

        if let Some(foreign) = state.race.take() {
            state.push_vrf(&foreign, table_id);
        }
        if state.links.iter().any(|link| link.name == name) {
            return Err(FabricError::platform_mutation("create_vrf", "File exists"));
        }

        let stale = state
            .routes
            .iter()
            .filter(|route| route.table == table_id)
            .count();
        state.routes_at_create.insert(name.to_string(), stale);
        state.push_vrf(name, table_id);
        Ok(())
    }

    fn delete_link(&self, name: &str) -> FabricResult<()> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::DeleteLink {
            name: name.to_string(),
        });
        state.check(FailOp::DeleteLink, "delete_link")?;

        let before = state.links.len();
        state.links.retain(|link| link.name != name);
        if state.links.len() == before {
            return Err(FabricError::platform_mutation("delete_link", "No such device"));
        }
        Ok(())
    }

    fn list_routes(&self, family: IpFamily, table_id: u32) -> FabricResult<Vec<Route>> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::ListRoutes { family, table_id });
        state.check(FailOp::ListRoutes, "list_routes")?;

        Ok(state
            .routes
            .iter()
            .filter(|route| route.family == family && route.table == table_id)
            .cloned()
            .collect())
    }

    fn delete_route(&self, route: &Route) -> FabricResult<()> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::DeleteRoute(route.clone()));
        state.check(FailOp::DeleteRoute, "delete_route")?;

        match state.routes.iter().position(|r| r == route) {
            Some(pos) => {
                state.routes.remove(pos);
                Ok(())
            }
            None => Err(FabricError::platform_mutation("delete_route", "No such process")),
        }
    }

    fn set_link_up(&self, name: &str) -> FabricResult<()> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::SetLinkUp {
            name: name.to_string(),
        });
        state.check(FailOp::SetLinkUp, "set_link_up")?;

        match state.links.iter_mut().find(|link| link.name == name) {
            Some(link) => {
                link.up = true;
                Ok(())
            }
            None => Err(FabricError::platform_mutation("set_link_up", "No such device")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::route_v4;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_links_filters_kind() {
        let kernel = FakeKernel::new()
            .with_vrf("G0000000jU00GV", 1)
            .with_link("eth0", "veth");

        assert_eq!(kernel.list_links(None).unwrap().len(), 2);
        let vrfs = kernel.list_links(Some(LinkKind::Vrf)).unwrap();
        assert_eq!(vrfs.len(), 1);
        assert_eq!(vrfs[0].name, "G0000000jU00GV");
    }

    #[test]
    fn test_create_existing_name_fails() {
        let kernel = FakeKernel::new().with_vrf("G0000000jU00GV", 1);
        let err = kernel.create_vrf("G0000000jU00GV", 2).unwrap_err();
        assert!(matches!(err, FabricError::PlatformMutation { .. }));
    }

    #[test]
    fn test_indexes_increase() {
        let kernel = FakeKernel::new();
        let a = kernel.add_vrf("a", 1);
        let b = kernel.add_vrf("b", 2);
        assert!(b > a);
    }

    #[test]
    fn test_remove_link_keeps_routes() {
        let kernel = FakeKernel::new()
            .with_vrf("a", 1)
            .with_route(route_v4(1, "10.0.0.0/8"));
        assert!(kernel.remove_link("a"));
        assert!(!kernel.remove_link("a"));
        assert_eq!(kernel.routes_in_table(1).len(), 1);
    }

    #[test]
    fn test_injected_failure_is_recorded() {
        let kernel = FakeKernel::new();
        kernel.fail_on(FailOp::ListRoutes);

        let err = kernel.list_routes(IpFamily::V4, 1).unwrap_err();
        assert!(matches!(err, FabricError::PlatformQuery { .. }));
        assert_eq!(
            kernel.calls(),
            vec![KernelCall::ListRoutes {
                family: IpFamily::V4,
                table_id: 1
            }]
        );

        kernel.clear_failures();
        assert!(kernel.list_routes(IpFamily::V4, 1).is_ok());
    }

    #[test]
    fn test_delete_unknown_route_fails() {
        let kernel = FakeKernel::new();
        let err = kernel.delete_route(&route_v4(1, "10.0.0.0/8")).unwrap_err();
        assert!(matches!(err, FabricError::PlatformMutation { .. }));
    }
}
