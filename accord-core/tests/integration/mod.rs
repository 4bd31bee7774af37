mod config_loading;
mod registry_storage;
mod signing_flow;
