/// Table definitions. Run with `search_path` set to the target schema.
///
/// Folios are `SERIAL` so the database sequence assigns them atomically.
/// `existencia >= 0` is enforced by a check constraint as a last line of
/// defence behind the row-locked check in the recorder.
pub const TABLES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS producto (
    codigo          VARCHAR(50) PRIMARY KEY,
    descripcion     VARCHAR(200) NOT NULL,
    categoria       VARCHAR(100),
    unidad_medida   VARCHAR(20),
    existencia      NUMERIC(10, 2) NOT NULL DEFAULT 0 CHECK (existencia >= 0),
    precio_c        NUMERIC(10, 2) NOT NULL CHECK (precio_c >= 0),
    precio_v        NUMERIC(10, 2) NOT NULL CHECK (precio_v >= 0)
);

CREATE TABLE IF NOT EXISTS cliente (
    id_c        SERIAL PRIMARY KEY,
    nombre      VARCHAR(150),
    telefono    VARCHAR(20),
    rfc         VARCHAR(20),
    domicilio   TEXT,
    correo      VARCHAR(100)
);

CREATE TABLE IF NOT EXISTS empleado (
    id_e        SERIAL PRIMARY KEY,
    nombre      VARCHAR(150) NOT NULL,
    puesto      VARCHAR(100),
    turno       VARCHAR(50),
    salario     NUMERIC(10, 2),
    telefono    VARCHAR(20)
);

CREATE TABLE IF NOT EXISTS proveedor (
    id_p        SERIAL PRIMARY KEY,
    nombre      VARCHAR(150) NOT NULL,
    contacto    VARCHAR(150),
    telefono    VARCHAR(20),
    direccion   TEXT
);

CREATE TABLE IF NOT EXISTS venta (
    folio_v     SERIAL PRIMARY KEY,
    fecha       TIMESTAMPTZ NOT NULL DEFAULT now(),
    id_c        INTEGER NOT NULL REFERENCES cliente (id_c),
    id_e        INTEGER NOT NULL REFERENCES empleado (id_e)
);

CREATE TABLE IF NOT EXISTS detalle_venta (
    id_dv           SERIAL PRIMARY KEY,
    folio_v         INTEGER NOT NULL REFERENCES venta (folio_v) ON DELETE RESTRICT,
    codigo          VARCHAR(50) NOT NULL REFERENCES producto (codigo),
    cantidad        NUMERIC(10, 2) NOT NULL CHECK (cantidad > 0),
    observaciones   TEXT
);

CREATE TABLE IF NOT EXISTS compra (
    folio_c     SERIAL PRIMARY KEY,
    fecha       TIMESTAMPTZ NOT NULL DEFAULT now(),
    id_p        INTEGER NOT NULL REFERENCES proveedor (id_p),
    id_e        INTEGER NOT NULL REFERENCES empleado (id_e),
    lote        VARCHAR(50)
);

CREATE TABLE IF NOT EXISTS detalle_compra (
    id_dc           SERIAL PRIMARY KEY,
    folio_c         INTEGER NOT NULL REFERENCES compra (folio_c) ON DELETE RESTRICT,
    codigo          VARCHAR(50) NOT NULL REFERENCES producto (codigo),
    cantidad        NUMERIC(10, 2) NOT NULL CHECK (cantidad > 0),
    costo_unitario  NUMERIC(10, 2) CHECK (costo_unitario >= 0)
);

CREATE INDEX IF NOT EXISTS detalle_venta_folio_idx ON detalle_venta (folio_v);
CREATE INDEX IF NOT EXISTS detalle_compra_folio_idx ON detalle_compra (folio_c);
CREATE INDEX IF NOT EXISTS venta_fecha_idx ON venta (fecha);
CREATE INDEX IF NOT EXISTS compra_fecha_idx ON compra (fecha);
"#;
