mod common;

use std::collections::BTreeMap;
use std::rc::Rc;
use std::cell::RefCell;

use opticap::domain::fiber::{Band, FREE_SLOT};
use opticap::error::Error;
use opticap::sim::controller::Controller;
use opticap::NullAllocator;

use common::{catalog_100g_bpsk, diamond_network, line_network, single_demand, two_node_network, FirstFit, Noop};

#[test]
fn test_single_link_provisioning() {
    let mut network = two_node_network(100.0, 320);
    network.set_paths(1).unwrap();

    let mut controller = Controller::with_network(network);
    controller.set_allocator(Box::new(FirstFit));

    let mut demands = single_demand(2, 0, 1, 100.0);
    let bitrates = catalog_100g_bpsk();
    controller.assign_connections(&mut demands, &bitrates, 1.0).unwrap();

    assert_eq!(controller.connections().len(), 1);
    let connection = &controller.connections()[0];
    assert_eq!(connection.id(), Some(0));
    assert_eq!(connection.time(), 1.0);
    assert_eq!(connection.hops().len(), 1);
    let hop = &connection.hops()[0];
    assert_eq!(hop.link, 0);
    assert_eq!((hop.slots.first, hop.slots.last), (0, 7));

    assert_eq!(demands.get(0, 1).unwrap().allocated_capacity(), 100.0);
    assert!(demands.get(0, 1).unwrap().is_provisioned());

    let network = controller.network().unwrap();
    for pos in 0..8 {
        assert_eq!(network.is_slot_used(0, 0, 0, Band::C, 0, pos).unwrap(), 0);
    }
    assert_eq!(network.is_slot_used(0, 0, 0, Band::C, 0, 8).unwrap(), FREE_SLOT);

    let usage = network.link(0).unwrap().usage_percentage();
    assert!((usage - 8.0 / 320.0 * 100.0).abs() < 1e-9);
}

#[test]
fn test_two_hop_provisioning_uses_same_range_on_every_hop() {
    let mut network = line_network(100.0, 320);
    network.set_paths(1).unwrap();

    let mut controller = Controller::with_network(network);
    controller.set_allocator(Box::new(FirstFit));

    let mut demands = single_demand(3, 0, 2, 200.0);
    let bitrates = catalog_100g_bpsk();
    controller.assign_connections(&mut demands, &bitrates, 1.0).unwrap();

    assert_eq!(controller.connections().len(), 2);
    let expected_ranges = [(0, 7), (8, 15)];
    for (connection, &(first, last)) in controller.connections().iter().zip(&expected_ranges) {
        assert_eq!(connection.hops().len(), 2);
        for hop in connection.hops() {
            assert_eq!(hop.core, 0);
            assert_eq!(hop.band, Band::C);
            assert_eq!(hop.mode, 0);
            assert_eq!((hop.slots.first, hop.slots.last), (first, last));
        }
        assert_eq!(connection.hops()[0].link, 0);
        assert_eq!(connection.hops()[1].link, 2);
    }

    let network = controller.network().unwrap();
    for link in [0, 2] {
        for pos in 0..8 {
            assert_eq!(network.is_slot_used(link, 0, 0, Band::C, 0, pos).unwrap(), 0);
        }
        for pos in 8..16 {
            assert_eq!(network.is_slot_used(link, 0, 0, Band::C, 0, pos).unwrap(), 1);
        }
        assert_eq!(network.is_slot_used(link, 0, 0, Band::C, 0, 16).unwrap(), FREE_SLOT);
    }

    assert_eq!(demands.get(0, 2).unwrap().allocated_capacity(), 200.0);
}

#[test]
fn test_allocated_capacity_matches_committed_bitrates() {
    let mut network = diamond_network();
    network.set_paths(2).unwrap();

    let mut controller = Controller::with_network(network);
    controller.set_allocator(Box::new(FirstFit));

    let mut demands = single_demand(4, 0, 3, 350.0);
    let bitrates = catalog_100g_bpsk();
    controller.assign_connections(&mut demands, &bitrates, 1.0).unwrap();

    let committed: f64 = controller
        .connections()
        .iter()
        .filter(|connection| connection.src() == 0 && connection.dst() == 3)
        .map(|connection| connection.bitrate().gbps())
        .sum();
    assert_eq!(committed, demands.get(0, 3).unwrap().allocated_capacity());
}

#[test]
fn test_connection_ids_are_monotonic_across_periods() {
    let mut network = two_node_network(100.0, 320);
    network.set_paths(1).unwrap();

    let mut controller = Controller::with_network(network);
    controller.set_allocator(Box::new(FirstFit));
    let bitrates = catalog_100g_bpsk();

    let mut demands = single_demand(2, 0, 1, 100.0);
    controller.assign_connections(&mut demands, &bitrates, 1.0).unwrap();
    demands.get_mut(0, 1).unwrap().set_required_capacity(300.0).unwrap();
    controller.assign_connections(&mut demands, &bitrates, 2.0).unwrap();

    let ids: Vec<u32> =
        controller.connections().iter().map(|connection| connection.id().unwrap()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(controller.connection(2).unwrap().time(), 2.0);
    assert!(matches!(controller.connection(9), Err(Error::OutOfRange(_))));
}

#[test]
fn test_null_allocator_commits_nothing() {
    let mut network = two_node_network(100.0, 320);
    network.set_paths(1).unwrap();

    let mut controller = Controller::with_network(network);
    controller.set_allocator(Box::new(NullAllocator));

    let mut demands = single_demand(2, 0, 1, 100.0);
    let bitrates = catalog_100g_bpsk();
    let result = controller.assign_connections(&mut demands, &bitrates, 1.0);

    assert!(matches!(result, Err(Error::Conflict(_))));
    assert!(controller.connections().is_empty());
    assert_eq!(demands.get(0, 1).unwrap().allocated_capacity(), 0.0);
    // the live network saw no slot writes
    let network = controller.network().unwrap();
    assert_eq!(network.is_slot_used(0, 0, 0, Band::C, 0, 0).unwrap(), FREE_SLOT);
}

#[test]
fn test_provisioning_without_network_fails() {
    let mut controller = Controller::new();
    controller.set_allocator(Box::new(Noop));
    let mut demands = single_demand(2, 0, 1, 100.0);
    let result = controller.assign_connections(&mut demands, &catalog_100g_bpsk(), 1.0);
    assert!(matches!(result, Err(Error::Conflict(_))));
}

#[test]
fn test_callback_runs_after_commit() {
    let mut network = two_node_network(100.0, 320);
    network.set_paths(1).unwrap();

    let mut controller = Controller::with_network(network);
    controller.set_allocator(Box::new(FirstFit));

    let observed: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&observed);
    controller.set_callback(Box::new(
        move |_network: &mut opticap::Network,
              _demands: &mut opticap::DemandMatrix,
              connections: &[opticap::Connection],
              _time: f64| {
            sink.borrow_mut().push(connections.len());
        },
    ));

    let mut demands = single_demand(2, 0, 1, 200.0);
    controller.assign_connections(&mut demands, &catalog_100g_bpsk(), 1.0).unwrap();

    // the callback saw the fully committed state of the period
    assert_eq!(observed.borrow().as_slice(), &[2]);
}

#[test]
fn test_add_link_recomputes_paths_lazily() {
    let mut network = two_node_network(100.0, 320);
    network.set_paths(1).unwrap();

    let mut controller = Controller::with_network(network);
    controller.set_allocator(Box::new(Noop));

    // a shorter parallel pair appears between the periods
    let matrix = BTreeMap::from([(Band::C, vec![vec![320usize]])]);
    controller.add_link(0, 1, 50.0, &matrix).unwrap();

    // not recomputed eagerly: the old route is still in place
    let before: Vec<usize> =
        controller.get_paths().unwrap().routes(0, 1)[0].links().to_vec();
    assert_eq!(before, vec![0]);

    let mut demands = single_demand(2, 0, 1, 0.0);
    controller.assign_connections(&mut demands, &catalog_100g_bpsk(), 1.0).unwrap();

    let after: Vec<usize> = controller.get_paths().unwrap().routes(0, 1)[0].links().to_vec();
    assert_eq!(after, vec![2], "the next period must see the shorter new link");
}

#[test]
fn test_add_node_extends_dense_sequence() {
    let mut network = two_node_network(100.0, 320);
    network.set_paths(1).unwrap();
    let mut controller = Controller::with_network(network);

    let node = opticap::Node::new(2);
    controller.add_node(node).unwrap();
    assert_eq!(controller.network().unwrap().number_of_nodes(), 3);

    // a gap in the id sequence is rejected
    assert!(matches!(controller.add_node(opticap::Node::new(9)), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_p2p_with_existing_fibers_dedicates_them() {
    let mut network = line_network(100.0, 320);
    network.set_paths(1).unwrap();
    let mut controller = Controller::with_network(network);

    let p2p_id = controller.add_p2p_with_fibers(0, 2, 0, &[0, 0]).unwrap();
    assert_eq!(p2p_id, 0);

    let p2p = controller.p2p(p2p_id).unwrap();
    assert_eq!(p2p.link_ids(), &[0, 2]);
    assert_eq!(p2p.fiber_idxs(), &[0, 0]);

    let network = controller.network().unwrap();
    assert!(network.link(0).unwrap().fiber(0).unwrap().is_dedicated_to_p2p());
    assert!(network.link(2).unwrap().fiber(0).unwrap().is_dedicated_to_p2p());

    // the same fibers cannot serve a second overlay
    assert!(matches!(
        controller.add_p2p_with_fibers(0, 2, 0, &[0, 0]),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn test_p2p_rejects_active_fiber() {
    let mut network = line_network(100.0, 320);
    network.set_paths(1).unwrap();
    network.use_slots(0, 0, 0, Band::C, 0, 0, 1, 42).unwrap();

    let mut controller = Controller::with_network(network);
    assert!(matches!(
        controller.add_p2p_with_fibers(0, 2, 0, &[0, 0]),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn test_p2p_with_fresh_fibers_appends_them() {
    let mut network = line_network(100.0, 320);
    network.set_paths(1).unwrap();
    let mut controller = Controller::with_network(network);

    let matrix = BTreeMap::from([(Band::C, vec![vec![100usize]])]);
    let p2p_id = controller.add_p2p(0, 2, 0, &matrix).unwrap();

    let p2p = controller.p2p(p2p_id).unwrap();
    assert_eq!(p2p.fiber_idxs(), &[1, 1]);

    let network = controller.network().unwrap();
    for link in [0, 2] {
        assert_eq!(network.link(link).unwrap().number_of_fibers(), 2);
        let fiber = network.link(link).unwrap().fiber(1).unwrap();
        assert!(fiber.is_dedicated_to_p2p());
        assert_eq!(fiber.number_of_slots(0, Band::C, 0).unwrap(), 100);
    }
}

#[test]
fn test_migration_moves_connection_to_p2p_fibers() {
    let mut network = line_network(100.0, 320);
    network.set_paths(1).unwrap();

    let mut controller = Controller::with_network(network);
    controller.set_allocator(Box::new(FirstFit));

    let mut demands = single_demand(3, 0, 2, 100.0);
    let bitrates = catalog_100g_bpsk();
    controller.assign_connections(&mut demands, &bitrates, 1.0).unwrap();
    assert_eq!(controller.connections().len(), 1);

    let matrix = BTreeMap::from([(Band::C, vec![vec![320usize]])]);
    let p2p_id = controller.add_p2p(0, 2, 0, &matrix).unwrap();

    controller
        .migrate_connection_to_p2p(p2p_id, 0, Band::C, 0, 0, 8, 0, bitrates[0].clone())
        .unwrap();

    let connection = controller.connection(0).unwrap();
    assert!(connection.is_allocated_in_p2p());
    assert_eq!(connection.hops().len(), 2);
    for hop in connection.hops() {
        assert_eq!(hop.fiber, 1);
        assert_eq!((hop.slots.first, hop.slots.last), (0, 7));
    }

    let network = controller.network().unwrap();
    for link in [0, 2] {
        // the old fiber is fully released
        assert_eq!(network.is_slot_used(link, 0, 0, Band::C, 0, 0).unwrap(), FREE_SLOT);
        // the p2p fiber now carries the connection
        assert_eq!(network.is_slot_used(link, 1, 0, Band::C, 0, 0).unwrap(), 0);
        assert_eq!(network.is_slot_used(link, 1, 0, Band::C, 0, 7).unwrap(), 0);
        assert_eq!(network.is_slot_used(link, 1, 0, Band::C, 0, 8).unwrap(), FREE_SLOT);
    }
}

#[test]
fn test_double_migration_fails() {
    let mut network = line_network(100.0, 320);
    network.set_paths(1).unwrap();

    let mut controller = Controller::with_network(network);
    controller.set_allocator(Box::new(FirstFit));

    let mut demands = single_demand(3, 0, 2, 100.0);
    let bitrates = catalog_100g_bpsk();
    controller.assign_connections(&mut demands, &bitrates, 1.0).unwrap();

    let matrix = BTreeMap::from([(Band::C, vec![vec![320usize]])]);
    let p2p_id = controller.add_p2p(0, 2, 0, &matrix).unwrap();

    controller
        .migrate_connection_to_p2p(p2p_id, 0, Band::C, 0, 0, 8, 0, bitrates[0].clone())
        .unwrap();
    let second = controller.migrate_connection_to_p2p(p2p_id, 0, Band::C, 0, 8, 16, 0, bitrates[0].clone());
    assert!(matches!(second, Err(Error::Conflict(_))));
}

#[test]
fn test_p2p_requires_computed_paths() {
    let network = line_network(100.0, 320);
    let mut controller = Controller::with_network(network);
    assert!(matches!(
        controller.add_p2p_with_fibers(0, 2, 0, &[0, 0]),
        Err(Error::Conflict(_))
    ));
}
