pub mod bson_fields;
pub mod incident;
pub mod notification;
pub mod pet;
pub mod user;

use mongodb::bson::oid::ObjectId;

/// Fresh document id in the hex form stored in every collection.
pub fn new_id() -> String {
    ObjectId::new().to_hex()
}
