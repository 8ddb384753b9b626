pub mod common {
    pub mod address;
    pub mod cmd_defs;
    pub mod defs;
}

pub mod gear {
    pub mod cmd_defs;
}

pub mod drivers;

pub mod light {
    pub mod address_set;
    pub mod bus;
    pub mod error;
    pub mod group;
    pub mod lamp;
    pub mod level;
    pub mod light_ref;
    pub mod registry;
    pub mod scanner;
    pub mod state;
    #[cfg(all(test, feature = "simulator"))]
    mod test;
}

pub mod mqtt {
    pub mod client;
    pub mod discovery;
    pub mod router;
    pub mod topics;
}

pub mod bridge;
pub mod config;
pub mod error;
pub mod names;
