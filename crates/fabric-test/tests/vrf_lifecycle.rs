//! VRF lifecycle integration tests
//!
//! Drives `VrfMgr` against the in-memory kernel and checks the resulting
//! kernel state.

use fabric_common::{FabricError, IpFamily};
use fabric_test::{
    default_route, route_v4, route_v6, tenants, FailOp, FakeKernel, KernelCall, KernelVerifier,
    RecordingSysctl, Tenant, SAMPLE_ATTACHMENT, SAMPLE_VPC, SAMPLE_VRF,
};
use fabric_vrfmgrd::{VrfInfo, VrfMgr};
use pretty_assertions::assert_eq;

fn manager(kernel: FakeKernel) -> VrfMgr<FakeKernel, RecordingSysctl> {
    VrfMgr::new(kernel, RecordingSysctl::new())
}

#[test]
fn test_add_then_delete() {
    let mgr = manager(FakeKernel::new());

    let vrf = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap();
    assert_eq!(vrf, VrfInfo::new(SAMPLE_VRF, 1));
    KernelVerifier::new(mgr.kernel())
        .assert_vrf(SAMPLE_VRF, 1)
        .unwrap();
    assert_eq!(mgr.sysctl().configured(), vec![SAMPLE_VRF.to_string()]);

    mgr.delete(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap();
    KernelVerifier::new(mgr.kernel())
        .assert_vrf_absent(SAMPLE_VRF)
        .unwrap();
}

#[test]
fn test_table_ids_stay_unique() {
    let mgr = manager(FakeKernel::new());

    let added: Vec<VrfInfo> = tenants(0x4d2, 8)
        .iter()
        .map(|t| mgr.add(&t.vpc, &t.attachment).unwrap())
        .collect();

    let ids: Vec<u32> = added.iter().map(|vrf| vrf.table_id).collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    KernelVerifier::new(mgr.kernel())
        .assert_unique_table_ids()
        .unwrap();
}

#[test]
fn test_freed_id_is_reused_first() {
    let mgr = manager(FakeKernel::new());
    let all = tenants(9, 4);
    for t in &all {
        mgr.add(&t.vpc, &t.attachment).unwrap();
    }

    // Free table 2, then a new tenant takes it
    mgr.delete(&all[1].vpc, &all[1].attachment).unwrap();
    let newcomer = Tenant::new(10, 1);
    let vrf = mgr.add(&newcomer.vpc, &newcomer.attachment).unwrap();
    assert_eq!(vrf.table_id, 2);

    KernelVerifier::new(mgr.kernel())
        .assert_unique_table_ids()
        .unwrap();
}

#[test]
fn test_stale_routes_flushed_before_reuse() {
    // A VRF removed behind our back leaves routes in table 1
    let kernel = FakeKernel::new()
        .with_vrf("Gstale00000001V", 1)
        .with_route(route_v4(1, "10.1.0.0/16"))
        .with_route(route_v6(1, "fd00:1::/64"))
        .with_route(default_route(1, "10.0.0.1".parse().unwrap()));
    assert!(kernel.remove_link("Gstale00000001V"));

    let mgr = manager(kernel);
    let vrf = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap();
    assert_eq!(vrf.table_id, 1);

    let verifier = KernelVerifier::new(mgr.kernel());
    verifier.assert_table_empty(1).unwrap();
    verifier
        .assert_flushed_before_create(SAMPLE_VRF, 1)
        .unwrap();
}

#[test]
fn test_delete_flushes_before_removal() {
    let kernel = FakeKernel::new()
        .with_vrf(SAMPLE_VRF, 4)
        .with_route(route_v4(4, "10.4.0.0/16"))
        .with_route(route_v6(4, "fd00:4::/64"));
    let mgr = manager(kernel);

    mgr.delete(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap();

    let calls = mgr.kernel().calls();
    let removal = calls
        .iter()
        .position(|c| matches!(c, KernelCall::DeleteLink { .. }))
        .unwrap();
    let route_deletes: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, KernelCall::DeleteRoute(_)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(route_deletes.len(), 2);
    assert!(route_deletes.iter().all(|i| *i < removal));
    KernelVerifier::new(mgr.kernel())
        .assert_table_empty(4)
        .unwrap();
}

#[test]
fn test_delete_unknown_vrf() {
    let mgr = manager(FakeKernel::new().with_vrf("Gother0000000V", 1));

    let err = mgr.delete(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap_err();
    assert!(matches!(err, FabricError::NotFound { ref name } if name == SAMPLE_VRF));
    assert_eq!(mgr.list_vrfs().unwrap().len(), 1);
}

#[test]
fn test_repeated_add_completes_partial_add() {
    let kernel = FakeKernel::new();
    kernel.fail_on(FailOp::SetLinkUp);
    let mgr = manager(kernel);

    // Link is created but never comes up
    assert!(mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).is_err());
    assert!(!mgr.kernel().link(SAMPLE_VRF).unwrap().up);

    mgr.kernel().clear_failures();
    let vrf = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap();
    assert_eq!(vrf, VrfInfo::new(SAMPLE_VRF, 1));
    KernelVerifier::new(mgr.kernel())
        .assert_vrf(SAMPLE_VRF, 1)
        .unwrap();
    assert_eq!(mgr.list_vrfs().unwrap().len(), 1);
}

#[test]
fn test_sysctl_failure_not_rolled_back() {
    let sysctl = RecordingSysctl::new();
    sysctl.fail();
    let mgr = VrfMgr::new(FakeKernel::new(), sysctl);

    let err = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap_err();
    assert!(matches!(err, FabricError::Sysctl { .. }));
    assert_eq!(mgr.list_vrfs().unwrap(), vec![VrfInfo::new(SAMPLE_VRF, 1)]);
}

#[test]
fn test_create_failure_after_flush() {
    let kernel = FakeKernel::new().with_route(route_v4(1, "10.1.0.0/16"));
    kernel.fail_on(FailOp::CreateVrf);
    let mgr = manager(kernel);

    let err = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap_err();
    assert!(err.is_platform());
    // The flush already happened and stays done
    assert!(mgr.kernel().routes_in_table(1).is_empty());
    assert!(mgr.list_vrfs().unwrap().is_empty());
}

#[test]
fn test_flush_list_failure_stops() {
    let kernel = FakeKernel::new().with_route(route_v6(3, "fd00::/64"));
    kernel.fail_on(FailOp::ListRoutes);
    let mgr = manager(kernel);

    let err = mgr.flush(3).unwrap_err();
    assert!(matches!(err, FabricError::PlatformQuery { .. }));
    assert_eq!(
        mgr.kernel().calls(),
        vec![KernelCall::ListRoutes {
            family: IpFamily::V4,
            table_id: 3
        }]
    );
}

#[test]
fn test_concurrent_creation_conflict() {
    let kernel = FakeKernel::new().with_vrf("Gfirst0000000V", 1);
    kernel.race_on_create("Gracer0000000V");
    let mgr = manager(kernel);

    let err = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap_err();
    assert!(matches!(err, FabricError::TableIdConflict { table_id: 2, .. }));

    let verifier = KernelVerifier::new(mgr.kernel());
    verifier.assert_vrf_absent(SAMPLE_VRF).unwrap();
    verifier.assert_unique_table_ids().unwrap();

    // A retry picks the next free table
    let vrf = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap();
    assert_eq!(vrf.table_id, 3);
}

#[test]
fn test_failed_conflict_cleanup_never_shares_table() {
    let kernel = FakeKernel::new();
    kernel.race_on_create("Gracer0000000V");
    kernel.fail_on(FailOp::DeleteLink);
    let mgr = manager(kernel);

    let err = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap_err();
    assert!(err.is_platform());

    mgr.kernel().clear_failures();
    // The leftover link still shares table 1 and must not be accepted
    let err = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap_err();
    assert!(matches!(err, FabricError::TableIdConflict { table_id: 1, .. }));
    KernelVerifier::new(mgr.kernel())
        .assert_unique_table_ids()
        .unwrap();

    let vrf = mgr.add(SAMPLE_VPC, SAMPLE_ATTACHMENT).unwrap();
    assert_eq!(vrf, VrfInfo::new(SAMPLE_VRF, 2));
    let verifier = KernelVerifier::new(mgr.kernel());
    verifier.assert_vrf(SAMPLE_VRF, 2).unwrap();
    verifier.assert_unique_table_ids().unwrap();
}

#[test]
fn test_parallel_adds_share_manager() {
    let mgr = manager(FakeKernel::new());
    let all = tenants(0xabc, 16);

    std::thread::scope(|scope| {
        for t in &all {
            let mgr = &mgr;
            scope.spawn(move || mgr.add(&t.vpc, &t.attachment).unwrap());
        }
    });

    let mut ids: Vec<u32> = mgr
        .list_vrfs()
        .unwrap()
        .into_iter()
        .map(|vrf| vrf.table_id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=16).collect::<Vec<_>>());
    KernelVerifier::new(mgr.kernel())
        .assert_unique_table_ids()
        .unwrap();
}
