fn main() -> std::process::ExitCode {
    pool_miner_lib::run()
}
