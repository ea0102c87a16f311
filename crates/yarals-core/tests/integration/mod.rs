mod listener_tests;
mod protocol_tests;
