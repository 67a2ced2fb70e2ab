#[macro_use]
extern crate rocket;

#[launch]
#[cfg(not(tarpaulin_include))]
fn rocket() -> _ {
    stashmark_api::rocket()
}
