//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one path through the
//! gate service against mock adapters.  All tests run on the host with no
//! real hardware required.

mod bus_variant_tests;
mod exchange_tests;
mod radio_link_tests;
mod remote_command_tests;
