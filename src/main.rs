use peltast::{alert, App, AppConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::new()
        .with_title("peltast")
        .with_size(1280, 720);

    if let Err(e) = App::run(config) {
        alert::fatal("Fatal Error", &e.to_string());
    }
}
