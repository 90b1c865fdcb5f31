fn main() {
    orms_service::run(orms_service::ServiceProfile::ROOT);
}
