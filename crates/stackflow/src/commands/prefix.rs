use stackflow_core::NamingConfig;

pub fn handle() {
    println!("{}", NamingConfig::from_env().prefix());
}
