//! Concrete filesystem drivers.
//!
//! Each backend module provides a type implementing
//! [`VolumeDriver`](crate::driver::VolumeDriver).

pub mod glusterfs;
