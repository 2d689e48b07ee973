include!(concat!(env!("OUT_DIR"), "/skiff_config.rs"));
