#![allow(dead_code, unused_imports)]

pub use ohscan_test_utils::{builders, console, fake_prompt, init_tracing, with_timeout};
