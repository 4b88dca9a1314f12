pub mod monitor_models;
