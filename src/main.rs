fn main() {
    if let Err(err) = revenue_lens::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
