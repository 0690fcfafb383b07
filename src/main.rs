fn main() -> eyre::Result<()> {
    picshrink::main()
}
