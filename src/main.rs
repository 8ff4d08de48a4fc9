fn main() {
    if let Err(err) = sobject_reconcile::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
