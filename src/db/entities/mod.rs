pub mod synthetics_monitor;
