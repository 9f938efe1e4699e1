#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    certificate_press_server::run().await
}
