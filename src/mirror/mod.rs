//! Best-effort relational mirror.
//!
//! Each submitted record is mirrored into the `transito` schema of a
//! PostgreSQL instance: one occurrence row plus one victim row, committed in
//! a single transaction. Reference labels (occurrence nature, accident type,
//! vehicle type, municipality) resolve to ids through caches loaded at
//! connect time; a label with no cached id mirrors as NULL instead of
//! blocking the insert.

mod coerce;

use std::time::Duration;

use log::{info, warn};
use rustc_hash::FxHashMap;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::config::MirrorConfig;
use crate::error::{Result, StoreError};
use crate::record::Record;
use coerce::{coerce_bool, coerce_int, coerce_time, non_empty};

/// PostgreSQL mirror with label lookup caches
pub struct RelationalMirror {
    config: MirrorConfig,
    pool: Option<PgPool>,
    natures: FxHashMap<String, i32>,
    accident_types: FxHashMap<String, i32>,
    vehicle_types: FxHashMap<String, i32>,
    municipalities: FxHashMap<String, i32>,
}

impl RelationalMirror {
    #[must_use]
    pub fn new(config: MirrorConfig) -> Self {
        Self {
            config,
            pool: None,
            natures: FxHashMap::default(),
            accident_types: FxHashMap::default(),
            vehicle_types: FxHashMap::default(),
            municipalities: FxHashMap::default(),
        }
    }

    /// Build a mirror from the `DB_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(MirrorConfig::from_env()?))
    }

    /// Open the connection pool and load the lookup caches.
    ///
    /// A no-op when already connected. Cache load failures are logged and
    /// leave the caches empty; the connection itself still counts.
    pub async fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let options = PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password);
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(self.config.connect_timeout_secs))
            .connect_with(options)
            .await?;

        info!(
            "mirror connected to {}:{}/{}",
            self.config.host, self.config.port, self.config.database
        );
        self.load_caches(&pool).await;
        self.pool = Some(pool);
        Ok(())
    }

    async fn load_caches(&mut self, pool: &PgPool) {
        self.natures = label_cache(
            pool,
            "SELECT id_natureza, descricao FROM transito.tbl_natureza_ocorrencia",
        )
        .await;
        self.accident_types = label_cache(
            pool,
            "SELECT id_tipo_acidente, descricao FROM transito.tbl_tipo_acidente",
        )
        .await;
        self.vehicle_types = label_cache(
            pool,
            "SELECT id_tipo_veiculo, descricao FROM transito.tbl_tipo_veiculo",
        )
        .await;
        self.municipalities = label_cache(
            pool,
            "SELECT DISTINCT id_municipio, no_municipio \
             FROM ppe_resumo.endereco_procedimento_tb \
             WHERE id_municipio IS NOT NULL AND no_municipio IS NOT NULL",
        )
        .await;
        info!(
            "lookup caches: {} natures, {} accident types, {} vehicle types, {} municipalities",
            self.natures.len(),
            self.accident_types.len(),
            self.vehicle_types.len(),
            self.municipalities.len()
        );
    }

    /// Mirror one record, connecting first when needed.
    ///
    /// Returns the generated occurrence id.
    pub async fn insert_record(&mut self, record: &Record) -> Result<i32> {
        self.connect().await?;
        let pool = self.pool.clone().ok_or_else(|| {
            StoreError::ConnectionFailed("mirror pool unavailable".to_string())
        })?;

        let mut tx = pool.begin().await?;

        let occurrence_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO transito.tbl_ocorrencia (\
                 numero_bo, tot_bos, tot_vitimas, data_fato, hora_fato, \
                 dia_semana, mes_referencia, id_municipio, logradouro, \
                 subtipo_local, id_natureza, id_tipo_acidente, latitude, longitude\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING id_ocorrencia",
        )
        .bind(non_empty(&record.report_number))
        .bind(coerce_int(&record.report_count))
        .bind(coerce_int(&record.victim_count))
        .bind(record.incident_date)
        .bind(coerce_time(&record.incident_time))
        .bind(non_empty(&record.weekday))
        .bind(non_empty(&record.month))
        .bind(self.municipality_id(&record.municipality))
        .bind(non_empty(&record.street))
        .bind(non_empty(&record.site_subtype))
        .bind(self.nature_id(&record.occurrence_nature))
        .bind(self.accident_type_id(&record.accident_type))
        .bind(record.latitude)
        .bind(record.longitude)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO transito.tbl_vitima (\
                 id_ocorrencia, nome_vitima, sexo, data_nascimento, idade, \
                 cpf, filiacao, possui_cnh, e_condutor, exame_alcoolemia, \
                 uso_capacete, id_veiculo_vitima, id_veiculo_envolvido, \
                 data_obito, local_morte, num_laudo_iml, natureza_laudo\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
                 $13, $14, $15, $16, $17)",
        )
        .bind(occurrence_id)
        .bind(non_empty(&record.victim_name))
        .bind(non_empty(&record.sex))
        .bind(record.birth_date)
        .bind(record.age.map(|a| a as i32))
        .bind(non_empty(&record.cpf))
        .bind(non_empty(&record.parentage))
        .bind(non_empty(&record.has_license))
        .bind(coerce_bool(&record.is_driver))
        .bind(non_empty(&record.alcohol_test))
        .bind(non_empty(&record.helmet_use))
        .bind(self.vehicle_type_id(&record.victim_vehicle))
        .bind(self.vehicle_type_id(&record.involved_vehicle))
        .bind(record.death_date)
        .bind(non_empty(&record.death_location))
        .bind(non_empty(&record.autopsy_report_number))
        .bind(non_empty(&record.autopsy_nature))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("mirrored occurrence {occurrence_id}");
        Ok(occurrence_id)
    }

    /// Connect, run a probe query and close
    pub async fn test_connection(&mut self) -> Result<()> {
        self.connect().await?;
        if let Some(pool) = &self.pool {
            sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
        }
        self.disconnect().await;
        Ok(())
    }

    /// Close the pool; safe to call repeatedly
    pub async fn disconnect(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
    }

    /// True while a pool is open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    fn nature_id(&self, label: &str) -> Option<i32> {
        lookup(&self.natures, label)
    }

    fn accident_type_id(&self, label: &str) -> Option<i32> {
        lookup(&self.accident_types, label)
    }

    fn vehicle_type_id(&self, label: &str) -> Option<i32> {
        lookup(&self.vehicle_types, label)
    }

    fn municipality_id(&self, label: &str) -> Option<i32> {
        lookup(&self.municipalities, label)
    }
}

/// Load one label-to-id lookup table; a failure leaves the cache empty
async fn label_cache(pool: &PgPool, sql: &str) -> FxHashMap<String, i32> {
    match sqlx::query_as::<_, (i32, String)>(sql).fetch_all(pool).await {
        Ok(rows) => rows
            .into_iter()
            .map(|(id, label)| (cache_key(&label), id))
            .collect(),
        Err(e) => {
            warn!("lookup cache load failed: {e}");
            FxHashMap::default()
        }
    }
}

/// Lookup keys are trimmed and lowercased
fn cache_key(label: &str) -> String {
    label.trim().to_lowercase()
}

fn lookup(cache: &FxHashMap<String, i32>, label: &str) -> Option<i32> {
    let key = cache_key(label);
    if key.is_empty() {
        return None;
    }
    cache.get(&key).copied()
}
