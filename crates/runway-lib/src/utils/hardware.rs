use sysinfo::System;

/// Returns the total physical memory in Megabytes
pub fn get_total_memory_mb() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory() / 1024 / 1024
}

/// Default `-Xmx` for new options: 4 GiB on machines with more than 15 GB of RAM
pub fn default_max_memory_mb() -> u32 {
    if get_total_memory_mb() > 15 * 1024 {
        4096
    } else {
        2048
    }
}
