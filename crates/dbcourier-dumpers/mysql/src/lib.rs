mod mysql_dumper;

pub use mysql_dumper::{MysqlDumper, MysqlDumperConfig};
