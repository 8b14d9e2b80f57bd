mod scheduler;
mod sgd;
mod updater;
