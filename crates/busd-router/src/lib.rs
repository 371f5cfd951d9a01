//! Per-peer session routing for the busd data plane.
//!
//! A remote peer reachable only through other daemons gets one
//! [`SessionRouteTable`]: the record that maps its sessions onto the
//! daemon-to-daemon links allowed to carry them, with failover forwarding
//! and an explicit session-use-count contract on the links.

#![forbid(unsafe_code)]

mod route_table;

pub use route_table::{RouteError, RouterConfig, SessionRouteTable};
