mod sim_client;
mod text_wrap;
mod traffic_config;
