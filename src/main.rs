fn main() {
    std::process::exit(caixa_lib::run());
}
