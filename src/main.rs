fn main() {
    pbd_fluid::start();
}
