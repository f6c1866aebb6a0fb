fn main() {
    if let Err(err) = pheno_meta::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
