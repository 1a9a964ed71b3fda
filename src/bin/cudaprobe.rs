use cudaprobe::probe;

fn main() {
    env_logger::init();

    let Some(handle) = probe::detect_from_env() else {
        eprintln!("no usable Nvidia GPU library found");
        std::process::exit(1);
    };

    match probe::gpu_info(&handle) {
        Ok(info) => {
            println!("backend:            {}", info.kind);
            println!("library:            {}", handle.library_path());
            println!("devices:            {}", info.device_count);
            println!("total VRAM:         {} bytes", info.total_memory);
            println!("free VRAM:          {} bytes", info.free_memory);
            println!("compute capability: {}", info.compute_capability);

            match probe::available_vram_with_override(&info) {
                Ok(avail) => println!("schedulable VRAM:   {} bytes", avail),
                Err(err) => eprintln!("schedulable VRAM unavailable: {}", err),
            }
        }
        Err(err) => {
            eprintln!("GPU probe failed: {}", err);
            std::process::exit(1);
        }
    }
}
