fn main() {
    if let Err(err) = alloy_trace_graph::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
