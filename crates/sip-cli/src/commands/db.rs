use anyhow::{Context, Result};
use sip_db::EntityStore;

pub async fn status() -> Result<()> {
    let pool = sip_db::connect_from_env().await?;
    let s = sip_db::status(&pool).await?;
    println!("db_ok={} has_beverages_table={}", s.ok, s.has_beverages_table);
    Ok(())
}

pub async fn migrate() -> Result<()> {
    let pool = sip_db::connect_from_env().await?;
    sip_db::migrate(&pool).await?;
    println!("migrations_applied=true");
    Ok(())
}

/// No-op on a database that already holds any catalog rows.
pub async fn seed() -> Result<()> {
    let pool = sip_db::connect_from_env().await?;
    sip_db::migrate(&pool).await?;

    let seed = sip_db::default_seed();
    let store = sip_db::PgStore::new(pool);
    let applied = store
        .bootstrap(&seed)
        .await
        .context("seed bootstrap failed")?;

    println!("seed_applied={applied}");
    if applied {
        println!("beverages={}", seed.beverages.len());
        println!("ingredients={}", seed.ingredients.len());
        println!("users={}", seed.users.len());
    }
    Ok(())
}
