fn main() {
    // The ESP-IDF sysenv hand-off is only meaningful when building the
    // firmware binary for the target; host (test) builds skip it.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
