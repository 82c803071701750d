fn main() {
    silvia_ctl::runtime::run_from_args();
}
