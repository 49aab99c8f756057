//! Shared bits of the debug hosts: a synthetic camera and a synthetic drive publisher.

pub mod synthetic;
