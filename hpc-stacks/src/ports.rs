// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Well-known ports for the file-system protocols the storage stacks carry
//!
//! Each storage security group admits only the ports its protocol needs, so
//! the port sets live here in one place rather than scattered through the
//! stack builders.

use cfn_types::ec2::PortRange;

/// NFS, used by both EFS and OpenZFS.
pub const NFS_PORT: u16 = 2049;

/// The portmapper/rpcbind port OpenZFS clients use to discover service
/// ports.
pub const PORTMAPPER_PORT: u16 = 111;

/// OpenZFS mount, status, and lock daemon ports.
pub const OPENZFS_DAEMON_PORTS: PortRange = PortRange::range(20001, 20003);

/// The Lustre networking (LNET) port.
pub const LUSTRE_PORT: u16 = 988;

/// Ports used between Lustre file servers and clients alongside
/// [`LUSTRE_PORT`].
pub const LUSTRE_PEER_PORTS: PortRange = PortRange::range(1018, 1023);
