#![allow(dead_code)]

pub mod rebate_testkit;
