pub mod ctl;
pub mod perfmon;
pub mod pkt;

#[cfg(test)]
mod test;
