//! Unit tests

mod test_fsm;
mod test_group;
mod test_signal;
