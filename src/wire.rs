use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::Sink;
use futures::stream;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::auth::LendrAuthSource;
use crate::engine::{Engine, ErrorClass};
use crate::model::{BookingView, CommentView, ItemInfo, UserInfo};
use crate::observability;
use crate::sql::{self, Command};
use crate::tenant::TenantManager;

pub struct LendrHandler {
    tenant_manager: Arc<TenantManager>,
    query_parser: Arc<LendrQueryParser>,
}

impl LendrHandler {
    pub fn new(tenant_manager: Arc<TenantManager>) -> Self {
        Self {
            tenant_manager,
            query_parser: Arc::new(LendrQueryParser),
        }
    }

    fn resolve_engine<C: ClientInfo>(&self, client: &C) -> PgWireResult<Arc<Engine>> {
        let db = client
            .metadata()
            .get("database")
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        self.tenant_manager.get_or_create(&db).map_err(|e| {
            PgWireError::UserError(Box::new(ErrorInfo::new(
                "ERROR".into(),
                "08006".into(),
                format!("tenant error: {e}"),
            )))
        })
    }

    async fn dispatch(&self, engine: &Engine, cmd: Command) -> PgWireResult<Vec<Response>> {
        let label = observability::command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(engine, cmd).await;
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        result
    }

    async fn execute_command(&self, engine: &Engine, cmd: Command) -> PgWireResult<Vec<Response>> {
        match cmd {
            Command::InsertUser { id, name, email } => {
                engine.create_user(id, name, email).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateUser { id, name, email } => {
                engine.update_user(id, name, email).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::SelectUserById { id } => {
                let user = engine.get_user(id).map_err(engine_err)?;
                Ok(vec![user_rows(vec![user])])
            }
            Command::InsertItem {
                id,
                owner_id,
                name,
                description,
                available,
            } => {
                engine
                    .create_item(id, owner_id, name, description, available)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateItem {
                id,
                caller_id,
                name,
                description,
                available,
            } => {
                engine
                    .update_item(id, caller_id, name, description, available)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::SelectItemById { id } => {
                let item = engine.get_item(id).await.map_err(engine_err)?;
                Ok(vec![item_rows(vec![item])])
            }
            Command::SelectItemsByOwner {
                owner_id,
                from,
                size,
            } => {
                let items = engine
                    .list_items_by_owner(owner_id, from, size)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![item_rows(items)])
            }
            Command::InsertBooking {
                id,
                item_id,
                booker_id,
                start,
                end,
            } => {
                engine
                    .create_booking(id, item_id, booker_id, start, end)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::DecideBooking {
                id,
                caller_id,
                approved,
            } => {
                engine
                    .decide_booking(id, caller_id, approved)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::SelectBookingById { id, caller_id } => {
                let booking = engine.get_booking(caller_id, id).await.map_err(engine_err)?;
                Ok(vec![booking_rows(vec![booking])])
            }
            Command::SelectBookingsByBooker {
                booker_id,
                state,
                from,
                size,
            } => {
                let bookings = engine
                    .list_as_booker(booker_id, &state, from, size)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![booking_rows(bookings)])
            }
            Command::SelectBookingsByOwner {
                owner_id,
                state,
                from,
                size,
            } => {
                let bookings = engine
                    .list_as_owner(owner_id, &state, from, size)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![booking_rows(bookings)])
            }
            Command::InsertComment {
                id,
                item_id,
                author_id,
                text,
            } => {
                engine
                    .add_comment(id, item_id, author_id, text)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::SelectComments { item_id } => {
                let comments = engine.list_comments(item_id).await.map_err(engine_err)?;
                Ok(vec![comment_rows(comments)])
            }
        }
    }
}

// ── Row schemas and encoding ─────────────────────────────────────

fn varchar(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn int8(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::INT8, FieldFormat::Text)
}

fn boolean(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::BOOL, FieldFormat::Text)
}

fn users_schema() -> Vec<FieldInfo> {
    vec![varchar("id"), varchar("name"), varchar("email")]
}

fn items_schema() -> Vec<FieldInfo> {
    vec![
        varchar("id"),
        varchar("owner_id"),
        varchar("name"),
        varchar("description"),
        boolean("available"),
        int8("last_start"),
        int8("last_end"),
        int8("next_start"),
        int8("next_end"),
    ]
}

fn bookings_schema() -> Vec<FieldInfo> {
    vec![
        varchar("id"),
        int8("start"),
        int8("end"),
        varchar("status"),
        varchar("booker_id"),
        varchar("booker_name"),
        varchar("item_id"),
        varchar("item_name"),
    ]
}

fn comments_schema() -> Vec<FieldInfo> {
    vec![
        varchar("id"),
        varchar("item_id"),
        varchar("author_id"),
        varchar("author_name"),
        varchar("text"),
        int8("created_at"),
    ]
}

fn user_rows(users: Vec<UserInfo>) -> Response {
    let schema = Arc::new(users_schema());
    let rows: Vec<PgWireResult<_>> = users
        .into_iter()
        .map(|u| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&u.id.to_string())?;
            encoder.encode_field(&u.name)?;
            encoder.encode_field(&u.email)?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

fn item_rows(items: Vec<ItemInfo>) -> Response {
    let schema = Arc::new(items_schema());
    let rows: Vec<PgWireResult<_>> = items
        .into_iter()
        .map(|i| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&i.id.to_string())?;
            encoder.encode_field(&i.owner_id.to_string())?;
            encoder.encode_field(&i.name)?;
            encoder.encode_field(&i.description)?;
            encoder.encode_field(&i.available)?;
            encoder.encode_field(&i.last.map(|s| s.start))?;
            encoder.encode_field(&i.last.map(|s| s.end))?;
            encoder.encode_field(&i.next.map(|s| s.start))?;
            encoder.encode_field(&i.next.map(|s| s.end))?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

fn booking_rows(bookings: Vec<BookingView>) -> Response {
    let schema = Arc::new(bookings_schema());
    let rows: Vec<PgWireResult<_>> = bookings
        .into_iter()
        .map(|b| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&b.id.to_string())?;
            encoder.encode_field(&b.start)?;
            encoder.encode_field(&b.end)?;
            encoder.encode_field(&b.status.as_str())?;
            encoder.encode_field(&b.booker_id.to_string())?;
            encoder.encode_field(&b.booker_name)?;
            encoder.encode_field(&b.item_id.to_string())?;
            encoder.encode_field(&b.item_name)?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

fn comment_rows(comments: Vec<CommentView>) -> Response {
    let schema = Arc::new(comments_schema());
    let rows: Vec<PgWireResult<_>> = comments
        .into_iter()
        .map(|c| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&c.id.to_string())?;
            encoder.encode_field(&c.item_id.to_string())?;
            encoder.encode_field(&c.author_id.to_string())?;
            encoder.encode_field(&c.author_name)?;
            encoder.encode_field(&c.text)?;
            encoder.encode_field(&c.created_at)?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

/// Result schema for a statement, by the table it reads. Mutations return
/// no rows.
fn statement_schema(sql: &str) -> Vec<FieldInfo> {
    let upper = sql.to_uppercase();
    if !upper.contains("SELECT") {
        return vec![];
    }
    if upper.contains("FROM BOOKINGS") {
        bookings_schema()
    } else if upper.contains("FROM ITEMS") {
        items_schema()
    } else if upper.contains("FROM COMMENTS") {
        comments_schema()
    } else if upper.contains("FROM USERS") {
        users_schema()
    } else {
        vec![]
    }
}

#[async_trait]
impl SimpleQueryHandler for LendrHandler {
    async fn do_query<C>(&self, client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        self.dispatch(&engine, cmd).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct LendrQueryParser;

#[async_trait]
impl QueryParser for LendrQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(statement_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for LendrHandler {
    type Statement = String;
    type QueryParser = LendrQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        let mut responses = self.dispatch(&engine, cmd).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            statement_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(statement_schema(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start
                && let Ok(n) = sql[start..i].parse::<usize>()
                && n > max
            {
                max = n;
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Render a bound parameter (text format) as a SQL literal.
fn param_literal(param: &Option<bytes::Bytes>) -> String {
    match param {
        Some(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            format!("'{}'", text.replace('\'', "''"))
        }
        None => "NULL".to_string(),
    }
}

/// Substitute $1, $2, ... placeholders with bound parameter values.
fn substitute_params(portal: &Portal<String>) -> String {
    let mut result = portal.statement.statement.to_string();
    for (i, param) in portal.parameters.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        result = result.replace(&placeholder, &param_literal(param));
    }
    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct LendrFactory {
    handler: Arc<LendrHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<LendrAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl LendrFactory {
    pub fn new(tenant_manager: Arc<TenantManager>, password: String) -> Self {
        let auth_source = LendrAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(LendrHandler::new(tenant_manager)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for LendrFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection to completion.
pub async fn process_connection(
    socket: TcpStream,
    tenant_manager: Arc<TenantManager>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> Result<(), std::io::Error> {
    let factory = LendrFactory::new(tenant_manager, password);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

/// Map engine failures onto SQLSTATEs by class: absence (and disguised
/// authorization) → no_data_found, validation → raise_exception, unknown
/// listing state → invalid_parameter_value, the rest → internal_error.
fn engine_err(e: crate::engine::EngineError) -> PgWireError {
    let code = match e.class() {
        ErrorClass::NotFound => "P0002",
        ErrorClass::Validation => "P0001",
        ErrorClass::UnsupportedState => "22023",
        ErrorClass::Internal => "XX000",
    };
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        e.to_string(),
    )))
}

fn sql_err(e: crate::sql::SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
