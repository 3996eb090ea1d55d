//! Postgres [`EntityStore`] backend.

use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use sip_schemas::{
    Beverage, BeverageFields, BeverageId, BeverageIngredient, BeverageWrite, ChangeSet,
    GlassType, Ingredient, IngredientId, IngredientRef, LinkId, Provenance, UserId,
};
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::{EntityStore, FavoriteOutcome, SeedData, StoreError};

const BEVERAGE_COLUMNS: &str = "beverage_id, name, tag, alcohol, glass, instruction, image, \
     video, image_attribution, creative_commons_confirmed, version";

/// Translate a sqlx failure into a [`StoreError`], keeping constraint names.
fn map_sqlx(err: sqlx::Error, ctx: &'static str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or("unknown").to_string();
        match db_err.code().as_deref() {
            Some("23505") => return StoreError::UniqueViolation { constraint },
            Some("23503") => return StoreError::ForeignKeyViolation { constraint },
            _ => {}
        }
    }
    StoreError::Backend(anyhow::Error::new(err).context(ctx))
}

fn beverage_from_row(row: &PgRow) -> Result<Beverage, StoreError> {
    let decode = |e| map_sqlx(e, "decode beverage row");
    let glass_label: String = row.try_get("glass").map_err(decode)?;
    let glass = GlassType::parse_label(&glass_label).ok_or_else(|| {
        StoreError::Backend(anyhow!("beverages.glass holds unknown value '{glass_label}'"))
    })?;
    Ok(Beverage {
        id: Some(BeverageId(row.try_get("beverage_id").map_err(decode)?)),
        external_id: None,
        name: row.try_get("name").map_err(decode)?,
        tag: row.try_get("tag").map_err(decode)?,
        alcohol: row.try_get("alcohol").map_err(decode)?,
        glass: Some(glass),
        instruction: row.try_get("instruction").map_err(decode)?,
        image: row.try_get("image").map_err(decode)?,
        video: row.try_get("video").map_err(decode)?,
        image_attribution: row.try_get("image_attribution").map_err(decode)?,
        creative_commons_confirmed: row.try_get("creative_commons_confirmed").map_err(decode)?,
        provenance: Provenance::Local,
        version: row.try_get("version").map_err(decode)?,
        ingredients: Vec::new(),
    })
}

fn ingredient_from_row(row: &PgRow) -> Result<Ingredient, StoreError> {
    let decode = |e| map_sqlx(e, "decode ingredient row");
    Ok(Ingredient {
        id: Some(IngredientId(row.try_get("ingredient_id").map_err(decode)?)),
        name: row.try_get("name").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        image: row.try_get("image").map_err(decode)?,
    })
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Attach links (ordered by link id) to already-loaded beverages.
    async fn attach_links(&self, beverages: &mut [Beverage]) -> Result<(), StoreError> {
        let ids: Vec<i64> = beverages.iter().filter_map(|b| b.id).map(|id| id.0).collect();
        if ids.is_empty() {
            return Ok(());
        }

        let rows = sqlx::query(
            r#"
            select bi.beverage_ingredient_id, bi.beverage_id, bi.measurement,
                   i.ingredient_id, i.name, i.description, i.image
            from beverage_ingredients bi
            join ingredients i on i.ingredient_id = bi.ingredient_id
            where bi.beverage_id = any($1)
            order by bi.beverage_ingredient_id asc
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "load beverage links"))?;

        let mut by_beverage: BTreeMap<i64, Vec<BeverageIngredient>> = BTreeMap::new();
        for row in &rows {
            let decode = |e| map_sqlx(e, "decode link row");
            let beverage_id: i64 = row.try_get("beverage_id").map_err(decode)?;
            let link = BeverageIngredient {
                id: Some(LinkId(row.try_get("beverage_ingredient_id").map_err(decode)?)),
                ingredient: ingredient_from_row(row)?,
                measurement: row.try_get("measurement").map_err(decode)?,
            };
            by_beverage.entry(beverage_id).or_default().push(link);
        }

        for b in beverages.iter_mut() {
            if let Some(id) = b.id {
                b.ingredients = by_beverage.remove(&id.0).unwrap_or_default();
            }
        }
        Ok(())
    }

    async fn load_beverages(&self, rows: Vec<PgRow>) -> Result<Vec<Beverage>, StoreError> {
        let mut out = rows
            .iter()
            .map(beverage_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.attach_links(&mut out).await?;
        Ok(out)
    }
}

async fn write_beverage(
    tx: &mut Transaction<'_, Postgres>,
    write: &BeverageWrite,
) -> Result<i64, StoreError> {
    match write {
        BeverageWrite::Insert(f) => {
            let row = bind_fields(
                sqlx::query(
                    r#"
                    insert into beverages
                      (name, tag, alcohol, glass, instruction, image, video,
                       image_attribution, creative_commons_confirmed, version)
                    values ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1)
                    returning beverage_id
                    "#,
                ),
                f,
            )
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx(e, "insert beverage"))?;
            row.try_get("beverage_id")
                .map_err(|e| map_sqlx(e, "decode beverage_id"))
        }
        BeverageWrite::Update {
            id,
            expected_version,
            fields,
        } => {
            let res = bind_fields(
                sqlx::query(
                    r#"
                    update beverages
                    set name = $1, tag = $2, alcohol = $3, glass = $4, instruction = $5,
                        image = $6, video = $7, image_attribution = $8,
                        creative_commons_confirmed = $9, version = version + 1
                    where beverage_id = $10 and version = $11
                    "#,
                ),
                fields,
            )
            .bind(id.0)
            .bind(*expected_version)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx(e, "update beverage"))?;

            if res.rows_affected() == 1 {
                return Ok(id.0);
            }

            let current: Option<i64> =
                sqlx::query_scalar("select version from beverages where beverage_id = $1")
                    .bind(id.0)
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx(e, "recheck beverage version"))?;
            Err(match current {
                None => StoreError::MissingRow {
                    what: "beverage",
                    id: id.0,
                },
                Some(found) => StoreError::StaleVersion {
                    beverage_id: *id,
                    expected: *expected_version,
                    found,
                },
            })
        }
    }
}

fn bind_fields<'q>(
    q: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    f: &'q BeverageFields,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    q.bind(&f.name)
        .bind(&f.tag)
        .bind(f.alcohol)
        .bind(f.glass.as_str())
        .bind(&f.instruction)
        .bind(&f.image)
        .bind(&f.video)
        .bind(&f.image_attribution)
        .bind(f.creative_commons_confirmed)
}

#[async_trait]
impl EntityStore for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn find_beverage(&self, id: BeverageId) -> Result<Option<Beverage>, StoreError> {
        let row = sqlx::query(&format!(
            "select {BEVERAGE_COLUMNS} from beverages where beverage_id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "find beverage"))?;

        match row {
            None => Ok(None),
            Some(r) => Ok(self.load_beverages(vec![r]).await?.pop()),
        }
    }

    async fn find_beverage_id_by_name(
        &self,
        name: &str,
    ) -> Result<Option<BeverageId>, StoreError> {
        let id: Option<i64> =
            sqlx::query_scalar("select beverage_id from beverages where name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx(e, "find beverage by name"))?;
        Ok(id.map(BeverageId))
    }

    async fn search_beverages(&self, term: &str) -> Result<Vec<Beverage>, StoreError> {
        let rows = sqlx::query(&format!(
            "select {BEVERAGE_COLUMNS} from beverages \
             where strpos(lower(name), lower($1)) > 0 \
             order by beverage_id asc"
        ))
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "search beverages"))?;
        self.load_beverages(rows).await
    }

    async fn find_ingredients(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(|i| i.0).collect();
        let rows = sqlx::query(
            r#"
            select ingredient_id, name, description, image
            from ingredients
            where ingredient_id = any($1)
            order by ingredient_id asc
            "#,
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "find ingredients"))?;
        rows.iter().map(ingredient_from_row).collect()
    }

    async fn save_atomic(&self, changes: &ChangeSet) -> Result<BeverageId, StoreError> {
        if !changes.staged_refs_in_bounds() {
            return Err(StoreError::Rejected(
                "staged ingredient reference out of bounds".to_string(),
            ));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx(e, "begin save"))?;

        let beverage_id = write_beverage(&mut tx, &changes.beverage).await?;

        let mut staged_ids = Vec::with_capacity(changes.new_ingredients.len());
        for ing in &changes.new_ingredients {
            let id: i64 = sqlx::query_scalar(
                r#"
                insert into ingredients (name, description, image)
                values ($1, $2, $3)
                returning ingredient_id
                "#,
            )
            .bind(&ing.name)
            .bind(&ing.description)
            .bind(&ing.image)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx(e, "insert ingredient"))?;
            staged_ids.push(id);
        }

        for link in &changes.new_links {
            let ingredient_id = match link.ingredient {
                IngredientRef::Existing(i) => i.0,
                IngredientRef::Staged(idx) => staged_ids[idx],
            };
            sqlx::query(
                r#"
                insert into beverage_ingredients (beverage_id, ingredient_id, measurement)
                values ($1, $2, $3)
                "#,
            )
            .bind(beverage_id)
            .bind(ingredient_id)
            .bind(&link.measurement)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx(e, "insert beverage ingredient"))?;
        }

        for upd in &changes.link_updates {
            let res = sqlx::query(
                r#"
                update beverage_ingredients
                set measurement = $1
                where beverage_ingredient_id = $2 and beverage_id = $3
                "#,
            )
            .bind(&upd.measurement)
            .bind(upd.link_id.0)
            .bind(beverage_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx(e, "update beverage ingredient"))?;
            if res.rows_affected() != 1 {
                return Err(StoreError::MissingRow {
                    what: "beverage ingredient",
                    id: upd.link_id.0,
                });
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx(e, "commit save"))?;

        debug!(
            beverage_id,
            mutations = changes.mutation_count(),
            "save_atomic committed"
        );
        Ok(BeverageId(beverage_id))
    }

    async fn delete_beverage(&self, id: BeverageId) -> Result<bool, StoreError> {
        let res = sqlx::query("delete from beverages where beverage_id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "delete beverage"))?;
        Ok(res.rows_affected() > 0)
    }

    async fn favorites_for_user(
        &self,
        user: UserId,
    ) -> Result<Option<Vec<Beverage>>, StoreError> {
        let exists: bool =
            sqlx::query_scalar("select exists (select 1 from users where user_id = $1)")
                .bind(user.0)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx(e, "check user"))?;
        if !exists {
            return Ok(None);
        }

        let rows = sqlx::query(
            r#"
            select b.*
            from beverages b
            join favorites f on f.beverage_id = b.beverage_id
            where f.user_id = $1
            order by b.beverage_id asc
            "#,
        )
        .bind(user.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "load favorites"))?;
        Ok(Some(self.load_beverages(rows).await?))
    }

    async fn add_favorite(
        &self,
        user: UserId,
        beverage: BeverageId,
    ) -> Result<FavoriteOutcome, StoreError> {
        let row = sqlx::query(
            r#"
            select exists (select 1 from users where user_id = $1) as user_ok,
                   exists (select 1 from beverages where beverage_id = $2) as beverage_ok
            "#,
        )
        .bind(user.0)
        .bind(beverage.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "check favorite keys"))?;
        let user_ok: bool = row
            .try_get("user_ok")
            .map_err(|e| map_sqlx(e, "decode user_ok"))?;
        let beverage_ok: bool = row
            .try_get("beverage_ok")
            .map_err(|e| map_sqlx(e, "decode beverage_ok"))?;
        if !user_ok {
            return Ok(FavoriteOutcome::UnknownUser);
        }
        if !beverage_ok {
            return Ok(FavoriteOutcome::UnknownBeverage);
        }

        let res = sqlx::query(
            r#"
            insert into favorites (user_id, beverage_id)
            values ($1, $2)
            on conflict (user_id, beverage_id) do nothing
            "#,
        )
        .bind(user.0)
        .bind(beverage.0)
        .execute(&self.pool)
        .await;

        match res {
            Ok(r) if r.rows_affected() == 0 => Ok(FavoriteOutcome::AlreadyPresent),
            Ok(_) => Ok(FavoriteOutcome::Added),
            // The beverage was deleted between the check and the insert.
            Err(e) => match map_sqlx(e, "insert favorite") {
                StoreError::ForeignKeyViolation { constraint }
                    if constraint == "fk_favorite_beverage" =>
                {
                    Ok(FavoriteOutcome::UnknownBeverage)
                }
                StoreError::ForeignKeyViolation { .. } => Ok(FavoriteOutcome::UnknownUser),
                other => Err(other),
            },
        }
    }

    async fn bootstrap(&self, seed: &SeedData) -> Result<bool, StoreError> {
        seed.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx(e, "begin bootstrap"))?;

        sqlx::query("lock table beverages, ingredients, users in share row exclusive mode")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx(e, "lock tables for bootstrap"))?;

        let populated: bool = sqlx::query_scalar(
            r#"
            select exists (select 1 from beverages)
                or exists (select 1 from ingredients)
                or exists (select 1 from users)
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx(e, "check empty storage"))?;
        if populated {
            return Ok(false);
        }

        for u in &seed.users {
            sqlx::query("insert into users (user_id, user_name, email) values ($1, $2, $3)")
                .bind(u.id.0)
                .bind(&u.user_name)
                .bind(&u.email)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx(e, "seed user"))?;
        }

        for b in &seed.beverages {
            let f = &b.fields;
            sqlx::query(
                r#"
                insert into beverages
                  (beverage_id, name, tag, alcohol, glass, instruction, image, video,
                   image_attribution, creative_commons_confirmed, version)
                values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 1)
                "#,
            )
            .bind(b.id.0)
            .bind(&f.name)
            .bind(&f.tag)
            .bind(f.alcohol)
            .bind(f.glass.as_str())
            .bind(&f.instruction)
            .bind(&f.image)
            .bind(&f.video)
            .bind(&f.image_attribution)
            .bind(f.creative_commons_confirmed)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx(e, "seed beverage"))?;
        }

        for i in &seed.ingredients {
            sqlx::query(
                "insert into ingredients (ingredient_id, name, description, image) \
                 values ($1, $2, $3, $4)",
            )
            .bind(i.id.0)
            .bind(&i.ingredient.name)
            .bind(&i.ingredient.description)
            .bind(&i.ingredient.image)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx(e, "seed ingredient"))?;
        }

        for l in &seed.links {
            sqlx::query(
                "insert into beverage_ingredients \
                 (beverage_ingredient_id, beverage_id, ingredient_id, measurement) \
                 values ($1, $2, $3, $4)",
            )
            .bind(l.id.0)
            .bind(l.beverage_id.0)
            .bind(l.ingredient_id.0)
            .bind(&l.measurement)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx(e, "seed link"))?;
        }

        for (u, b) in &seed.favorites {
            sqlx::query("insert into favorites (user_id, beverage_id) values ($1, $2)")
                .bind(u.0)
                .bind(b.0)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx(e, "seed favorite"))?;
        }

        // Explicit keys bypass the identity sequences; move them past the seed.
        for (table, column) in [
            ("beverages", "beverage_id"),
            ("ingredients", "ingredient_id"),
            ("beverage_ingredients", "beverage_ingredient_id"),
            ("users", "user_id"),
        ] {
            sqlx::query(&format!(
                "select setval(pg_get_serial_sequence('{table}', '{column}'), \
                 coalesce((select max({column}) from {table}), 0) + 1, false)"
            ))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx(e, "advance identity sequence"))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx(e, "commit bootstrap"))?;
        Ok(true)
    }
}
