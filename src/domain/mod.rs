// Domain layer: records, report rows and the ports the pipeline talks to.

pub mod model;
pub mod ports;
pub mod report;
