fn main() -> anyhow::Result<()> {
    meadow::start()
}
